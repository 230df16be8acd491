//! HTTP API for driving a tutoring session from a front end.
//!
//! # Endpoints
//!
//! - `POST /api/session/start` - Start a session from OCR question text
//! - `POST /api/session/reply` - Submit a student reply
//! - `POST /api/session/emotion` - Push the latest detected emotion
//! - `GET /api/session/status` - Get the current session snapshot
//! - `POST /api/session/reset` - End the session
//!
//! # Example
//!
//! ```no_run
//! use lumen_tutor::{create_router, AppState, Config};
//!
//! # async fn example() -> lumen_tutor::Result<()> {
//! let state = AppState::from_config(Config::default())?;
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::emotion::Emotion;
use crate::error::{Result, TutorError};
use crate::language::Language;
use crate::llm::{OllamaClient, TutorModel};
use crate::mode::TeachingMode;
use crate::scoring::{build_ollama_tutoring, ScoringStrategy};
use crate::session::{SessionOpening, SessionStatus, TurnOutcome, TutoringSession};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the start endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Text extracted from the captured page.
    pub question_text: String,
    /// Response language; the configured default when absent.
    #[serde(default)]
    pub language: Option<Language>,
}

/// Request body for the reply endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    /// The student's answer.
    pub reply: String,
    /// Emotion detected while the student answered, if known.
    #[serde(default)]
    pub emotion: Option<Emotion>,
}

/// Request body for the emotion endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EmotionRequest {
    /// Emotion label from the classifier.
    pub emotion: Emotion,
}

/// Response body for the emotion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionResponse {
    /// The emotion as understood by the tutor.
    pub emotion: Emotion,
    /// Mode the next tutor message will use.
    pub mode: TeachingMode,
}

/// Response body for the reset endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    /// Always `true`.
    pub reset: bool,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// The one tutoring session this server drives.
    pub session: Arc<Mutex<TutoringSession>>,
    /// Generates the tutor's messages.
    pub tutor: Arc<dyn TutorModel>,
    /// Scores student replies.
    pub scorer: Arc<dyn ScoringStrategy>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("tutor", &self.tutor.name())
            .field("scorer", &self.scorer.name())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates state with an explicit tutor and scorer.
    #[must_use]
    pub fn new(
        config: Config,
        tutor: Arc<dyn TutorModel>,
        scorer: Arc<dyn ScoringStrategy>,
    ) -> Self {
        let session = TutoringSession::new(&config);
        Self {
            config,
            session: Arc::new(Mutex::new(session)),
            tutor,
            scorer,
        }
    }

    /// Creates state backed by the configured Ollama server, with demo
    /// replies when it is unreachable.
    ///
    /// Model scoring talks to the bare client, so a failed evaluation falls
    /// back to the heuristic and leaves the demo rotation untouched.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidPattern` if a scoring pattern is invalid.
    pub fn from_config(config: Config) -> Result<Self> {
        let (tutor, scorer) =
            build_ollama_tutoring(OllamaClient::new(&config.ollama), &config.scoring)?;
        Ok(Self::new(config, tutor, scorer))
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Error type for API handlers.
#[derive(Debug)]
struct ApiError(TutorError);

impl From<TutorError> for ApiError {
    fn from(e: TutorError) -> Self {
        Self(e)
    }
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match &self.0 {
            TutorError::EmptyQuestion => StatusCode::BAD_REQUEST,
            TutorError::SessionNotActive | TutorError::SessionComplete { .. } => {
                StatusCode::CONFLICT
            }
            TutorError::LlmApiError { .. } | TutorError::EvaluationParseError { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = %status, error = %self.0, "Request failed");
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// Routes live under `/api`, with permissive CORS for a local front end and
/// request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/session/start", post(handle_start))
        .route("/session/reply", post(handle_reply))
        .route("/session/emotion", post(handle_emotion))
        .route("/session/status", get(handle_status))
        .route("/session/reset", post(handle_reset));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `POST /api/session/start`.
async fn handle_start(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> std::result::Result<Json<SessionOpening>, ApiError> {
    info!(chars = request.question_text.len(), "Start request received");

    let mut session = state.session.lock().await;
    let opening = session
        .begin(&request.question_text, request.language, state.tutor.as_ref())
        .await?;

    Ok(Json(opening))
}

/// Handler for `POST /api/session/reply`.
async fn handle_reply(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReplyRequest>,
) -> std::result::Result<Json<TurnOutcome>, ApiError> {
    let mut session = state.session.lock().await;

    if let Some(emotion) = request.emotion {
        session.set_emotion(emotion);
    }

    let outcome = session
        .submit_reply(&request.reply, state.scorer.as_ref(), state.tutor.as_ref())
        .await?;

    info!(
        turn = outcome.record.turn,
        verdict = %outcome.record.verdict,
        score = outcome.record.score,
        mode = %outcome.mode,
        "Reply processed"
    );

    Ok(Json(outcome))
}

/// Handler for `POST /api/session/emotion`.
async fn handle_emotion(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmotionRequest>,
) -> Json<EmotionResponse> {
    let mut session = state.session.lock().await;
    session.set_emotion(request.emotion);

    Json(EmotionResponse {
        emotion: session.emotion(),
        mode: session.current_mode(),
    })
}

/// Handler for `GET /api/session/status`.
async fn handle_status(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    let session = state.session.lock().await;
    Json(session.status())
}

/// Handler for `POST /api/session/reset`.
async fn handle_reset(State(state): State<Arc<AppState>>) -> Json<ResetResponse> {
    let mut session = state.session.lock().await;
    session.reset();
    Json(ResetResponse { reset: true })
}

// ============================================================================
// Tests
// ============================================================================
