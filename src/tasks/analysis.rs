//! 学情分析报告
//!
//! 自由文本输出，没有兜底值：失败原因直接交给调用方展示。

use crate::client::{GenerationClient, GenerationOutput, GenerationStream};
use crate::error::GenerationFailure;
use crate::models::{ChatMessage, GenerationRequest, Subject};

/// 组装分析请求
pub fn build(student: &str, subject: Subject, recent_scores: &[u32]) -> GenerationRequest {
    let scores = recent_scores
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let system = format!("你是一位资深的{}教研组长。", subject);
    let user = format!(
        r#"学生 {student} 最近{count}次的{subject}测验成绩为：{scores}。

请生成一份专业的"定点优化辅导分析报告"：
1. **成绩走势诊断**：用专业的教学术语分析成绩波动情况。
2. **薄弱点推测**：根据分数段推测学生可能在哪些知识模块存在短板。
3. **个性化提升方案**：给出3条具体的、可执行的学习建议。

请不要使用Markdown标题语法（如# ##），直接使用加粗文本作为小标题。语气要专业、客观且充满教育关怀。"#,
        count = recent_scores.len(),
    );

    GenerationRequest::free_text(vec![ChatMessage::system(system), ChatMessage::user(user)])
}

/// 生成完整报告
pub async fn generate(
    client: &GenerationClient,
    student: &str,
    subject: Subject,
    recent_scores: &[u32],
) -> Result<GenerationOutput, GenerationFailure> {
    client.generate(build(student, subject, recent_scores)).await
}

/// 流式生成报告，界面逐字展示
pub fn generate_stream(
    client: &GenerationClient,
    student: &str,
    subject: Subject,
    recent_scores: &[u32],
) -> GenerationStream {
    client.generate_stream(build(student, subject, recent_scores))
}
