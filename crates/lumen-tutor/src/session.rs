//! Tutoring session state.
//!
//! A [`TutoringSession`] owns everything that belongs to one question: the
//! comprehension meter, the chat transcript, the detected subject, the
//! response language and the latest emotion reported by the poller. The
//! caller owns the session; nothing here is global.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, SubjectKeywords};
use crate::emotion::Emotion;
use crate::error::{Result, TutorError};
use crate::language::Language;
use crate::llm::{ChatMessage, TutorModel};
use crate::meter::{Badge, TurnRecord, UnderstandingMeter};
use crate::mode::{select_mode, TeachingMode};
use crate::prompt::{build_intro_message, build_system_prompt, detect_subject, PromptContext, GENERAL_SUBJECT};
use crate::question::Question;
use crate::scoring::ScoringStrategy;

// ============================================================================
// Outcomes and snapshots
// ============================================================================

/// Result of opening a session with the tutor's first message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOpening {
    /// Detected subject.
    pub subject: String,
    /// Teaching mode used for the first message.
    pub mode: TeachingMode,
    /// The tutor's first message.
    pub tutor_reply: String,
}

/// Result of one student turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// Meter snapshot after scoring the reply.
    pub record: TurnRecord,
    /// Teaching mode chosen for the tutor's answer.
    pub mode: TeachingMode,
    /// The tutor's answer.
    pub tutor_reply: String,
    /// `true` once the turn limit has been reached.
    pub session_complete: bool,
}

/// Read-only view of a session, used by the status endpoint and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Whether a question is being tutored.
    pub active: bool,
    /// Question text, empty when inactive.
    pub question_text: String,
    /// Detected subject.
    pub subject: String,
    /// Response language.
    pub language: Language,
    /// Latest emotion.
    pub emotion: Emotion,
    /// Current score.
    pub score: u32,
    /// Badge for the current score.
    pub badge: Badge,
    /// Turns taken.
    pub turn_count: u32,
    /// Turn limit.
    pub max_turns: u32,
    /// Consecutive incorrect replies.
    pub wrong_streak: u32,
    /// Mode the next tutor message will use.
    pub mode: TeachingMode,
    /// Whether the turn limit has been reached.
    pub complete: bool,
    /// When the current session started.
    pub started_at: DateTime<Utc>,
    /// Turn-by-turn meter history.
    pub history: Vec<TurnRecord>,
}

// ============================================================================
// TutoringSession
// ============================================================================

/// One student working through one question.
#[derive(Debug, Clone)]
pub struct TutoringSession {
    active: bool,
    question_text: String,
    subject: String,
    language: Language,
    default_language: Language,
    emotion: Emotion,
    meter: UnderstandingMeter,
    transcript: Vec<ChatMessage>,
    hint_threshold: u32,
    max_turns: u32,
    subjects: Vec<SubjectKeywords>,
}

impl TutoringSession {
    /// Creates an inactive session from the config.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            active: false,
            question_text: String::new(),
            subject: GENERAL_SUBJECT.to_string(),
            language: config.language,
            default_language: config.language,
            emotion: Emotion::default(),
            meter: UnderstandingMeter::new(config.meter),
            transcript: Vec::new(),
            hint_threshold: config.socratic.hint_threshold,
            max_turns: config.socratic.max_turns,
            subjects: config.subjects.clone(),
        }
    }

    /// Starts a fresh session for `question_text`.
    ///
    /// Detects the subject, resets the meter and clears the transcript. The
    /// latest emotion is kept since it describes the student, not the question.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::EmptyQuestion` if the text is blank.
    pub fn start(&mut self, question_text: &str, language: Option<Language>) -> Result<&str> {
        let question = Question::from_text(question_text)?;

        self.subject = detect_subject(&question.text, &self.subjects);
        self.question_text = question.text;
        self.language = language.unwrap_or(self.default_language);
        self.meter.reset();
        self.transcript.clear();
        self.active = true;

        tracing::info!(
            subject = %self.subject,
            language = %self.language,
            chars = self.question_text.len(),
            "Tutoring session started"
        );

        Ok(self.subject.as_str())
    }

    /// Sends the intro message to the tutor and records its first reply.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::SessionNotActive` before [`Self::start`], or the
    /// tutor's error if it cannot answer.
    pub async fn open(&mut self, tutor: &dyn TutorModel) -> Result<SessionOpening> {
        if !self.active {
            return Err(TutorError::SessionNotActive);
        }

        tutor.reset();
        let mode = self.current_mode();
        let system = self.system_prompt();
        let intro = self.intro_message();

        tracing::debug!(prompt_len = system.len(), mode = %mode, "Opening session");
        let reply = tutor.generate(&system, &[], &intro).await?;

        self.transcript.push(ChatMessage::user(intro));
        self.transcript.push(ChatMessage::assistant(reply.clone()));

        Ok(SessionOpening {
            subject: self.subject.clone(),
            mode,
            tutor_reply: reply,
        })
    }

    /// Starts a session and opens it in one step.
    ///
    /// # Errors
    ///
    /// See [`Self::start`] and [`Self::open`].
    pub async fn begin(
        &mut self,
        question_text: &str,
        language: Option<Language>,
        tutor: &dyn TutorModel,
    ) -> Result<SessionOpening> {
        self.start(question_text, language)?;
        self.open(tutor).await
    }

    /// Scores a student reply, picks the next teaching mode and asks the
    /// tutor for its answer.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::SessionNotActive` before [`Self::start`],
    /// `TutorError::SessionComplete` once the turn limit is reached, or the
    /// tutor's error if it cannot answer. The meter is updated before the
    /// tutor is called.
    pub async fn submit_reply(
        &mut self,
        reply: &str,
        scorer: &dyn ScoringStrategy,
        tutor: &dyn TutorModel,
    ) -> Result<TurnOutcome> {
        if !self.active {
            return Err(TutorError::SessionNotActive);
        }
        if self.is_complete() {
            return Err(TutorError::SessionComplete {
                max_turns: self.max_turns,
            });
        }

        let reply = reply.trim();
        let record = self.meter.update(reply, &self.subject, scorer).await;

        let mode = self.current_mode();
        let system = self.system_prompt();
        tracing::debug!(
            turn = record.turn,
            mode = %mode,
            scorer = scorer.name(),
            "Requesting tutor reply"
        );

        // small models drift back to English without a per-turn nudge
        let user_turn = if self.language == Language::English {
            reply.to_string()
        } else {
            format!("{reply}\n\n{}", self.language.response_reminder())
        };
        let tutor_reply = tutor.generate(&system, &self.transcript, &user_turn).await?;
        // user and assistant turns are appended as a pair so the history alternates
        self.transcript.push(ChatMessage::user(reply));
        self.transcript.push(ChatMessage::assistant(tutor_reply.clone()));

        let session_complete = self.is_complete();
        if session_complete {
            tracing::info!(
                turns = self.meter.turn_count,
                score = self.meter.score,
                "Turn limit reached"
            );
        }

        Ok(TurnOutcome {
            record,
            mode,
            tutor_reply,
            session_complete,
        })
    }

    /// Records the latest emotion from the poller.
    pub fn set_emotion(&mut self, emotion: Emotion) {
        if emotion != self.emotion {
            tracing::debug!(from = %self.emotion, to = %emotion, "Emotion changed");
        }
        self.emotion = emotion;
    }

    /// Changes the response language for the rest of the session.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Ends the session and returns to the inactive state.
    pub fn reset(&mut self) {
        self.active = false;
        self.question_text.clear();
        self.subject = GENERAL_SUBJECT.to_string();
        self.language = self.default_language;
        self.emotion = Emotion::default();
        self.meter.reset();
        self.transcript.clear();
        tracing::info!("Tutoring session reset");
    }

    /// Mode for the next tutor message.
    #[must_use]
    pub const fn current_mode(&self) -> TeachingMode {
        select_mode(
            self.meter.score,
            self.meter.wrong_streak,
            self.emotion,
            self.hint_threshold,
        )
    }

    /// System prompt for the current state.
    #[must_use]
    pub fn system_prompt(&self) -> String {
        build_system_prompt(&PromptContext {
            language: self.language,
            subject: &self.subject,
            score: self.meter.score,
            mode: self.current_mode(),
            emotion: self.emotion,
        })
    }

    /// First user turn presenting the question.
    #[must_use]
    pub fn intro_message(&self) -> String {
        build_intro_message(&self.question_text, self.language)
    }

    /// `true` once the turn limit has been reached.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.meter.turn_count >= self.max_turns
    }

    /// Whether a question is being tutored.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Question text, empty when inactive.
    #[must_use]
    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    /// Detected subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Response language.
    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Latest emotion.
    #[must_use]
    pub const fn emotion(&self) -> Emotion {
        self.emotion
    }

    /// The comprehension meter.
    #[must_use]
    pub const fn meter(&self) -> &UnderstandingMeter {
        &self.meter
    }

    /// Chat transcript, oldest first.
    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Configured turn limit.
    #[must_use]
    pub const fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Snapshot for display or serialization.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            active: self.active,
            question_text: self.question_text.clone(),
            subject: self.subject.clone(),
            language: self.language,
            emotion: self.emotion,
            score: self.meter.score,
            badge: self.meter.badge(),
            turn_count: self.meter.turn_count,
            max_turns: self.max_turns,
            wrong_streak: self.meter.wrong_streak,
            mode: self.current_mode(),
            complete: self.is_complete(),
            started_at: self.meter.started_at,
            history: self.meter.history.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
