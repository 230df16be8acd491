//! Error types for the Lumen tutor core.
//!
//! This module defines the error hierarchy for configuration loading,
//! tutor-model communication and session handling. The
//! comprehension meter itself never fails; errors only arise at its edges.

use std::path::PathBuf;

/// A specialized `Result` type for Lumen tutor operations.
pub type Result<T> = std::result::Result<T, TutorError>;

/// Errors that can occur while running a tutoring session.
///
/// Variants carry actionable suggestions where possible to help users
/// resolve the issue.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your lumen.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// A signal pattern in the scoring configuration is not a valid regex.
    #[error("Invalid signal pattern '{pattern}': {message}\n\nSuggestion: Fix or remove the pattern in the 'scoring' section of lumen.json")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        /// Compiler message from the regex engine.
        message: String,
    },

    // ========================================================================
    // Question Input Errors
    // ========================================================================
    /// The question file could not be found.
    #[error("Question file not found: '{path}'\n\nSuggestion: Pass the path to the OCR text output or pipe the question on stdin")]
    QuestionNotFound {
        /// Path where the question text was expected.
        path: PathBuf,
    },

    /// The question file exceeds the size limit.
    #[error("Question text exceeds size limit (32KB): '{path}' is {size_kb}KB\n\nSuggestion: Crop the image to a single question before running OCR")]
    QuestionTooLarge {
        /// Path to the oversized file.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
    },

    /// The question file is not valid UTF-8.
    #[error("Question text has invalid encoding: '{path}'\n\nSuggestion: Save the OCR output as UTF-8")]
    QuestionEncodingError {
        /// Path to the file with encoding issues.
        path: PathBuf,
    },

    /// No question text was provided to start a session.
    #[error("Question text is empty\n\nSuggestion: Capture a clearer image or check the OCR output")]
    EmptyQuestion,

    // ========================================================================
    // Tutor Model Errors
    // ========================================================================
    /// The local model server returned an error or could not be reached.
    #[error("Tutor model error ({kind}): {message}\n\nSuggestion: {suggestion}")]
    LlmApiError {
        /// The kind of failure.
        kind: LlmErrorKind,
        /// Detailed error message.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The model returned an evaluation that could not be interpreted.
    #[error("Unusable evaluation from tutor model: {message}")]
    EvaluationParseError {
        /// Description of what was wrong with the evaluation.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// A reply was submitted while no session is active.
    #[error("No tutoring session is active\n\nSuggestion: Start a session with a question first")]
    SessionNotActive,

    /// The session reached its configured turn limit.
    #[error("Session finished after {max_turns} turns\n\nSuggestion: Start a new session to explore another problem")]
    SessionComplete {
        /// The configured turn limit.
        max_turns: u32,
    },

    // ========================================================================
    // General Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Categories of tutor-model failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// The server could not be reached.
    Network,
    /// The request took longer than the configured timeout.
    Timeout,
    /// The requested model is not installed on the server.
    ModelNotFound,
    /// Server error (5xx responses).
    Server,
    /// The response body did not have the expected shape.
    InvalidResponse,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::ModelNotFound => write!(f, "model_not_found"),
            Self::Server => write!(f, "server"),
            Self::InvalidResponse => write!(f, "invalid_response"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl LlmErrorKind {
    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Network => "Make sure Ollama is installed and running ('ollama serve')",
            Self::Timeout => "Increase ollama.timeoutSeconds or use a smaller model",
            Self::ModelNotFound => "Pull the model first, e.g. 'ollama pull phi3'",
            Self::Server => "Retry later; check the Ollama server logs",
            Self::InvalidResponse => "Check that the server at ollama.baseUrl is an Ollama instance",
            Self::Other => "Re-run with --verbose for details",
        }
    }
}

impl TutorError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidPattern` error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates a new `QuestionNotFound` error.
    #[must_use]
    pub fn question_not_found(path: impl Into<PathBuf>) -> Self {
        Self::QuestionNotFound { path: path.into() }
    }

    /// Creates a new `QuestionTooLarge` error.
    #[must_use]
    pub fn question_too_large(path: impl Into<PathBuf>, size_kb: u64) -> Self {
        Self::QuestionTooLarge {
            path: path.into(),
            size_kb,
        }
    }

    /// Creates a new `QuestionEncodingError`.
    #[must_use]
    pub fn question_encoding(path: impl Into<PathBuf>) -> Self {
        Self::QuestionEncodingError { path: path.into() }
    }

    /// Creates a new `LlmApiError` with the suggestion for its kind.
    #[must_use]
    pub fn llm_api_error(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        let suggestion = kind.suggestion().to_string();
        Self::LlmApiError {
            kind,
            message: message.into(),
            suggestion,
        }
    }

    /// Creates a new `EvaluationParseError`.
    #[must_use]
    pub fn evaluation_parse(message: impl Into<String>) -> Self {
        Self::EvaluationParseError {
            message: message.into(),
        }
    }

    /// Returns `true` if the error came from the tutor model and a canned
    /// or heuristic answer can stand in for it.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::LlmApiError { .. } | Self::EvaluationParseError { .. }
        )
    }

    /// Returns `true` if the error prevents the program from starting.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::InvalidPattern { .. }
                | Self::QuestionNotFound { .. }
                | Self::QuestionTooLarge { .. }
                | Self::QuestionEncodingError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = TutorError::question_not_found("/tmp/question.txt");
        let msg = err.to_string();
        assert!(msg.contains("Question file not found"));
        assert!(msg.contains("/tmp/question.txt"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_llm_error_kind_display() {
        assert_eq!(LlmErrorKind::Network.to_string(), "network");
        assert_eq!(LlmErrorKind::ModelNotFound.to_string(), "model_not_found");
    }

    #[test]
    fn test_llm_api_error_carries_suggestion() {
        let err = TutorError::llm_api_error(LlmErrorKind::ModelNotFound, "phi3 missing");
        let msg = err.to_string();
        assert!(msg.contains("model_not_found"));
        assert!(msg.contains("ollama pull"));
    }

    #[test]
    fn test_is_recoverable() {
        let network = TutorError::llm_api_error(LlmErrorKind::Network, "connection refused");
        assert!(network.is_recoverable());

        let parse = TutorError::evaluation_parse("not json");
        assert!(parse.is_recoverable());

        assert!(!TutorError::SessionNotActive.is_recoverable());
    }

    #[test]
    fn test_is_fatal() {
        let config = TutorError::config_validation("bad", "fix it");
        assert!(config.is_fatal());

        let pattern = TutorError::invalid_pattern("(", "unclosed group");
        assert!(pattern.is_fatal());

        let network = TutorError::llm_api_error(LlmErrorKind::Network, "down");
        assert!(!network.is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TutorError = io_err.into();
        assert!(matches!(err, TutorError::Io(_)));
    }

    #[test]
    fn test_session_complete_display() {
        let err = TutorError::SessionComplete { max_turns: 8 };
        assert!(err.to_string().contains("8 turns"));
    }
}
