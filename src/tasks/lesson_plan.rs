//! 教案生成

use super::{run_structured, FeatureOutcome};
use crate::client::GenerationClient;
use crate::models::{ChatMessage, GenerationRequest, LessonPlan, Subject};

const GENERIC_TEXTBOOK: &str = "通用小学标准教材";

/// 组装教案请求
pub fn build(topic: &str, subject: Subject, textbook_context: Option<&str>) -> GenerationRequest {
    let context = match textbook_context {
        Some(ctx) if !ctx.trim().is_empty() => format!("教材版本上下文：{}", ctx),
        _ => GENERIC_TEXTBOOK.to_string(),
    };
    let textbook = textbook_context.unwrap_or("通用");

    let system = format!("你是一位全国特级{}教师，擅长设计完整的深度教学体系。", subject);
    let user = format!(
        r#"请基于"{context}"，针对"{topic}"这一单元/课题，设计一份完整的深度教学体系。

要求生成极其详细的教案，包含以下部分：
1. 教学目标（三维目标：知识与技能、过程与方法、情感态度价值观）
2. 教学重难点
3. 教学过程（精确到分钟的脚本，包含师生互动、提问设计、活动安排）
4. 板书设计（结构化展示）
5. 作业设计（分层作业）

请严格返回如下JSON结构：
{{
  "topic": "{topic}",
  "textbookContext": "{textbook}",
  "objectives": ["目标1", "目标2", "目标3"],
  "keyPoints": ["重点1", "难点1"],
  "process": [
    {{"phase": "一、激趣导入", "duration": "5分钟", "activity": "详细描述老师怎么说，学生怎么做..."}}
  ],
  "blackboard": ["主标题", "左侧要点", "右侧绘图"],
  "homework": "详细的作业描述"
}}"#
    );

    GenerationRequest::structured(vec![ChatMessage::system(system), ChatMessage::user(user)])
}

/// 兜底：没有教案
pub fn fallback() -> Option<LessonPlan> {
    None
}

pub async fn generate(
    client: &GenerationClient,
    topic: &str,
    subject: Subject,
    textbook_context: Option<&str>,
) -> FeatureOutcome<Option<LessonPlan>> {
    run_structured(client, build(topic, subject, textbook_context), fallback).await
}
