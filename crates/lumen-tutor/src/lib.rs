//! Lumen Tutor Core
//!
//! Comprehension meter, teaching-mode selection, prompt composition, tutor
//! model clients, tutoring sessions and the HTTP API.

pub mod api;
pub mod config;
pub mod emotion;
pub mod error;
pub mod language;
pub mod llm;
pub mod meter;
pub mod mode;
pub mod prompt;
pub mod question;
pub mod scoring;
pub mod session;

pub use api::{
    create_router, AppState, EmotionRequest, EmotionResponse, ErrorResponse, ReplyRequest,
    ResetResponse, StartRequest,
};
pub use config::{
    default_negative_patterns, default_positive_patterns, default_subjects, Config, MeterConfig,
    OllamaConfig, ScoringConfig, SocraticConfig, SubjectKeywords,
};
pub use emotion::Emotion;
pub use error::{LlmErrorKind, Result, TutorError};
pub use language::Language;
pub use llm::{build_messages, ChatMessage, ChatRole, DemoTutor, FallbackTutor, OllamaClient, TutorModel};
pub use meter::{Badge, TurnRecord, UnderstandingMeter, Verdict};
pub use mode::{select_mode, TeachingMode};
pub use prompt::{
    build_evaluation_prompt, build_intro_message, build_system_prompt, detect_subject,
    PromptContext, EVALUATOR_SYSTEM_PROMPT, GENERAL_SUBJECT,
};
pub use question::{Question, MAX_QUESTION_SIZE};
pub use scoring::{
    build_ollama_tutoring, build_scorer, parse_evaluation, Assessment, Evaluation, HeuristicScorer, ModelScorer,
    ScoreSource, ScoringStrategy,
};
pub use session::{SessionOpening, SessionStatus, TurnOutcome, TutoringSession};
