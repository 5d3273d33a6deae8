//! 作业批改建议

use super::{run_structured, FeatureOutcome};
use crate::client::GenerationClient;
use crate::models::{ChatMessage, GenerationRequest, GradingSuggestion, Subject};

/// 满分
pub const MAX_SCORE: u8 = 100;

/// 组装批改请求
pub fn build(subject: Subject, student: &str, content: &str) -> GenerationRequest {
    let system = format!(
        "你是一位经验丰富、和蔼可亲的小学{}老师，正在批改学生作业。",
        subject
    );
    let user = format!(
        r#"学生姓名：{student}。
作业内容/答案：
"{content}"

请根据作业内容进行专业批改。
1. 给出一个合理的预估分数（0-100），如果是数学题请严格检查计算，如果是作文请关注文采和逻辑。
2. 给出一段评语（50字左右）：语气温暖、鼓励，指出具体的优点，温柔地指出不足之处。

请严格以JSON格式返回，不要包含Markdown代码块标记：
{{"score": number, "feedback": "string"}}"#
    );

    GenerationRequest::structured(vec![ChatMessage::system(system), ChatMessage::user(user)])
}

/// 兜底：0 分并提示老师手动批改
pub fn fallback() -> GradingSuggestion {
    GradingSuggestion {
        score: 0,
        feedback: "AI 助教暂时休息中，请老师手动批改哦。".to_string(),
    }
}

pub async fn generate(
    client: &GenerationClient,
    subject: Subject,
    student: &str,
    content: &str,
) -> FeatureOutcome<GradingSuggestion> {
    run_structured(client, build(subject, student, content), fallback)
        .await
        .map(|mut suggestion| {
            suggestion.score = suggestion.score.min(MAX_SCORE);
            suggestion
        })
}
