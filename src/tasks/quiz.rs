//! 课后练习题生成
//!
//! 10 道题：3 道基础、4 道进阶、3 道挑战。正确答案下标越界的题目直接丢弃。

use super::{run_structured, FeatureOutcome};
use crate::client::GenerationClient;
use crate::models::{ChatMessage, GenerationRequest, QuizQuestion};

pub const QUESTION_COUNT: usize = 10;

/// 组装练习题请求
pub fn build(topic: &str, key_points: &[String]) -> GenerationRequest {
    let key_points = key_points.join(",");

    let system = "你是一位擅长设计趣味练习的小学教师。".to_string();
    let user = format!(
        r#"基于课题 "{topic}" 和重难点: {key_points}，
设计一份包含 {QUESTION_COUNT} 道题目的课后练习闯关卷。

要求：
1. 包含 3道基础题，4道进阶题，3道挑战题。
2. 题目要生动有趣，贴近小学生生活，避免枯燥的计算或死记硬背。
3. 选项要有干扰性，但解析要清晰。

请严格返回JSON数组：
[
  {{
    "difficulty": "基础" | "进阶" | "挑战",
    "question": "题目内容",
    "options": ["选项A", "选项B", "选项C", "选项D"],
    "correctAnswer": 0,
    "explanation": "解析内容"
  }}
]
其中 correctAnswer 为正确选项的下标（0-3）。"#
    );

    GenerationRequest::structured(vec![ChatMessage::system(system), ChatMessage::user(user)])
}

/// 兜底：空题单
pub fn fallback() -> Vec<QuizQuestion> {
    Vec::new()
}

/// 丢弃不合格题目
pub fn retain_well_formed(questions: Vec<QuizQuestion>) -> Vec<QuizQuestion> {
    let total = questions.len();
    let kept: Vec<QuizQuestion> = questions
        .into_iter()
        .filter(QuizQuestion::is_well_formed)
        .collect();
    if kept.len() < total {
        tracing::warn!("[TASK] 丢弃 {} 道不合格题目", total - kept.len());
    }
    kept
}

pub async fn generate(
    client: &GenerationClient,
    topic: &str,
    key_points: &[String],
) -> FeatureOutcome<Vec<QuizQuestion>> {
    run_structured(client, build(topic, key_points), fallback)
        .await
        .map(retain_well_formed)
}
