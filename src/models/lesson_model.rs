//! 教学业务模型
//!
//! 结构化生成任务的目标类型：批改建议、教案、课件大纲与练习题。
//! 字段命名与前端约定一致（camelCase）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 学科
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "数学")]
    Math,
    #[serde(rename = "英语")]
    English,
    #[serde(rename = "语文")]
    Chinese,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "数学",
            Subject::English => "英语",
            Subject::Chinese => "语文",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 作业批改建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingSuggestion {
    /// 0-100 分
    pub score: u8,
    pub feedback: String,
}

/// 教学环节
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingPhase {
    pub phase: String,
    pub duration: String,
    pub activity: String,
}

/// 教案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textbook_context: Option<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub process: Vec<TeachingPhase>,
    #[serde(default)]
    pub blackboard: Vec<String>,
    #[serde(default)]
    pub homework: String,
}

/// 课件页面版式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlideLayout {
    Title,
    Section,
    TwoColumn,
    Conclusion,
    /// 未知版式按内容页处理
    #[serde(other)]
    Content,
}

/// 课件页面
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationSlide {
    pub layout: SlideLayout,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_prompt: Option<String>,
}

/// 题目难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "基础")]
    Basic,
    #[serde(rename = "进阶")]
    Advanced,
    #[serde(rename = "挑战")]
    Challenge,
}

/// 练习题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub difficulty: Difficulty,
    pub question: String,
    pub options: Vec<String>,
    /// 正确选项下标
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
}

impl QuizQuestion {
    /// 正确答案必须落在选项范围内
    pub fn is_well_formed(&self) -> bool {
        !self.question.trim().is_empty() && self.correct_answer < self.options.len()
    }
}
