//! 数据模型

pub mod generation_model;
pub mod lesson_model;

pub use generation_model::{ChatMessage, GenerationMode, GenerationRequest, Role};
pub use lesson_model::{
    Difficulty, GradingSuggestion, LessonPlan, PresentationSlide, QuizQuestion, SlideLayout,
    Subject, TeachingPhase,
};
