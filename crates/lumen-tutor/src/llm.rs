//! Tutor model clients.
//!
//! [`TutorModel`] is the seam between the tutoring session and whatever
//! generates the tutor's words. [`OllamaClient`] talks to a local Ollama
//! server, [`DemoTutor`] cycles through canned Socratic replies, and
//! [`FallbackTutor`] answers from the demo script whenever its primary model
//! fails.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::OllamaConfig;
use crate::error::{LlmErrorKind, Result, TutorError};

/// Timeout for the health probe against the server root.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

// ============================================================================
// Chat messages
// ============================================================================

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions for the model.
    System,
    /// The student.
    User,
    /// The tutor.
    Assistant,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking.
    pub role: ChatRole,
    /// What was said.
    pub content: String,
}

impl ChatMessage {
    /// Creates a student message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Creates a tutor message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

/// Assembles the message list sent to a chat model: system message, prior
/// turns, then the new user message.
#[must_use]
pub fn build_messages(system: &str, history: &[ChatMessage], user: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(user));
    messages
}

// ============================================================================
// TutorModel
// ============================================================================

/// Something that can produce the tutor's next message.
#[async_trait]
pub trait TutorModel: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Generates a reply to `user`, given the system prompt and prior turns.
    async fn generate(&self, system: &str, history: &[ChatMessage], user: &str) -> Result<String>;

    /// Clears any per-session state. The default does nothing.
    fn reset(&self) {}
}

// ============================================================================
// OllamaClient
// ============================================================================

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaReplyMessage>,
}

#[derive(Deserialize)]
struct OllamaReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Deserialize)]
struct OllamaModelTag {
    name: String,
}

/// HTTP client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OllamaClient {
    /// Creates a client from the `ollama` config section.
    #[must_use]
    pub fn new(config: &OllamaConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured model tag.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns `true` if the server answers its root endpoint within 2 seconds.
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(format!("{}/", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, base_url = %self.base_url, "Ollama health probe failed");
                false
            }
        }
    }

    /// Lists the model tags installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response).await?;
        let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
            TutorError::llm_api_error(
                LlmErrorKind::InvalidResponse,
                format!("unexpected /api/tags body: {e}"),
            )
        })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Returns `true` if `name` is installed, with or without a tag suffix.
    pub async fn has_model(&self, name: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| model_matches(m, name)))
    }
}

/// `phi3` matches `phi3:latest`; `phi3:mini` matches only itself.
fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || installed
            .strip_prefix(wanted)
            .is_some_and(|rest| rest.starts_with(':'))
}

fn map_transport_error(e: reqwest::Error) -> TutorError {
    let kind = if e.is_timeout() {
        LlmErrorKind::Timeout
    } else if e.is_connect() {
        LlmErrorKind::Network
    } else if e.is_decode() {
        LlmErrorKind::InvalidResponse
    } else {
        LlmErrorKind::Other
    };
    TutorError::llm_api_error(kind, e.to_string())
}

fn kind_for_status(status: StatusCode) -> LlmErrorKind {
    if status == StatusCode::NOT_FOUND {
        LlmErrorKind::ModelNotFound
    } else if status.is_server_error() {
        LlmErrorKind::Server
    } else {
        LlmErrorKind::Other
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    Err(TutorError::llm_api_error(
        kind_for_status(status),
        format!("Ollama returned {status}: {body}"),
    ))
}

#[async_trait]
impl TutorModel for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, system: &str, history: &[ChatMessage], user: &str) -> Result<String> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages: build_messages(system, history, user),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        tracing::debug!(
            model = %self.model,
            messages = body.messages.len(),
            "Sending chat request to Ollama"
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response).await?;
        let chat: OllamaChatResponse = response.json().await.map_err(|e| {
            TutorError::llm_api_error(
                LlmErrorKind::InvalidResponse,
                format!("unexpected /api/chat body: {e}"),
            )
        })?;

        let reply = chat
            .message
            .map(|m| m.content.trim().to_string())
            .ok_or_else(|| {
                TutorError::llm_api_error(LlmErrorKind::InvalidResponse, "response has no message")
            })?;

        tracing::debug!(chars = reply.len(), "Received Ollama reply");
        Ok(reply)
    }
}

// ============================================================================
// DemoTutor
// ============================================================================

const DEMO_RESPONSES: [&str; 5] = [
    "That is a great question! Before I give you the answer, let me ask: \
     What does Newton's Second Law of Motion tell us about the relationship \
     between force, mass, and acceleration?",
    "Good thinking! Now, if F = m x a, and we know the mass of the object, \
     what value would you substitute for 'm' in the formula?",
    "Excellent! You have substituted the mass correctly. \
     Now look at the acceleration value given in the problem. \
     Can you plug it in and calculate the result?",
    "You are almost there! Check your arithmetic once more. \
     What unit does force have, and does your answer carry that unit?",
    "Well done! You solved it. Can you now explain in your own words \
     why a heavier object needs more force to achieve the same acceleration?",
];

/// Offline tutor that cycles through a fixed script.
///
/// Each instance owns its rotation counter.
#[derive(Debug)]
pub struct DemoTutor {
    responses: Vec<String>,
    next: AtomicUsize,
}

impl Default for DemoTutor {
    fn default() -> Self {
        Self::with_responses(DEMO_RESPONSES.iter().map(|s| (*s).to_string()).collect())
    }
}

impl DemoTutor {
    /// Creates a demo tutor with the built-in script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a demo tutor with a custom script.
    #[must_use]
    pub const fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses,
            next: AtomicUsize::new(0),
        }
    }

    /// Returns the next scripted reply and advances the rotation.
    pub fn next_response(&self) -> String {
        if self.responses.is_empty() {
            return String::new();
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        self.responses[index % self.responses.len()].clone()
    }
}

#[async_trait]
impl TutorModel for DemoTutor {
    fn name(&self) -> &str {
        "demo"
    }

    async fn generate(&self, _system: &str, _history: &[ChatMessage], _user: &str) -> Result<String> {
        Ok(self.next_response())
    }

    fn reset(&self) {
        self.next.store(0, Ordering::Relaxed);
    }
}

// ============================================================================
// FallbackTutor
// ============================================================================

/// Wraps a primary model and answers from a [`DemoTutor`] when it fails.
#[derive(Debug)]
pub struct FallbackTutor<P> {
    primary: P,
    demo: DemoTutor,
}

impl<P: TutorModel> FallbackTutor<P> {
    /// Creates a fallback wrapper with the built-in demo script.
    #[must_use]
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            demo: DemoTutor::new(),
        }
    }
}

#[async_trait]
impl<P: TutorModel> TutorModel for FallbackTutor<P> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn generate(&self, system: &str, history: &[ChatMessage], user: &str) -> Result<String> {
        match self.primary.generate(system, history, user).await {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(
                    model = self.primary.name(),
                    error = %e,
                    "Tutor model unavailable, answering in demo mode"
                );
                self.demo.generate(system, history, user).await
            }
            Err(e) => Err(e),
        }
    }

    fn reset(&self) {
        self.primary.reset();
        self.demo.reset();
    }
}

// ============================================================================
// Tests
// ============================================================================
