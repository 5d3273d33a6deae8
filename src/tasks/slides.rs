//! 课件大纲生成

use super::{run_structured, FeatureOutcome};
use crate::client::GenerationClient;
use crate::models::{ChatMessage, GenerationRequest, PresentationSlide, Subject};

/// 组装课件请求
pub fn build(topic: &str, objectives: &[String], subject: Subject) -> GenerationRequest {
    let objectives = if objectives.is_empty() {
        "（未指定，请根据课题自拟）".to_string()
    } else {
        objectives.join("；")
    };

    let system = format!("你是一名专业的小学{}教师和PPT设计专家。", subject);
    let user = format!(
        r#"请为课题 "{topic}" 设计一套8-12页的高端教学PPT大纲。教学目标：{objectives}。

设计要求：
1. 视觉Prompt设计：为每一页生成一个英文 visualPrompt。
   - 封面页："Masterpiece, 3D abstract composition related to {topic}, cinematic lighting, high detail, warm colors"
   - 内容页："Soft educational background pattern, minimalist, {subject} elements, light colors, ample whitespace for text"
2. 内容精炼：内容要适合PPT展示，每页不超过4个要点。
3. 结构：
   - 第1页：封面 (TITLE)
   - 第2页：教学目标
   - 第3-N页：核心知识点，图文并茂 (CONTENT 或 TWO_COLUMN)
   - 倒数第2页：课堂互动
   - 最后一页：总结与作业 (CONCLUSION)

请严格返回JSON数组：
[
  {{
    "layout": "TITLE" | "CONTENT" | "TWO_COLUMN" | "CONCLUSION",
    "title": "页面标题",
    "content": ["要点1", "要点2", "要点3"],
    "notes": "演讲备注...",
    "visualPrompt": "Detailed English description for image generation"
  }}
]"#
    );

    GenerationRequest::structured(vec![ChatMessage::system(system), ChatMessage::user(user)])
}

/// 兜底：空课件
pub fn fallback() -> Vec<PresentationSlide> {
    Vec::new()
}

pub async fn generate(
    client: &GenerationClient,
    topic: &str,
    objectives: &[String],
    subject: Subject,
) -> FeatureOutcome<Vec<PresentationSlide>> {
    run_structured(client, build(topic, objectives, subject), fallback).await
}
