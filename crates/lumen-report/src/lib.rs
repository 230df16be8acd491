//! Lumen Session Reports
//!
//! Turns the history of a finished tutoring session into a [`Report`] that can
//! be serialized to JSON for tooling or rendered to Markdown for students and
//! teachers.
//!
//! # Types
//!
//! - [`ReportInput`] - Raw session data handed over by the caller
//! - [`Report`] - The complete report: summary, timeline, recommendations
//! - [`ReportSummary`] - Headline numbers for the session
//! - [`TimelineEntry`] - One scored turn
//! - [`Recommendation`] - A prioritized study suggestion
//!
//! # Generators
//!
//! - [`ReportGenerator`] - Builds a [`Report`] from a [`ReportInput`]
//! - [`json::JsonGenerator`] - Compact or pretty JSON output
//! - [`MarkdownGenerator`] - Human-readable Markdown output
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use lumen_report::{MarkdownGenerator, ReportGenerator, ReportInput};
//!
//! let now = Utc::now();
//! let input = ReportInput {
//!     question_text: "A force of 10 N acts on a 2 kg mass.".to_string(),
//!     subject: "physics".to_string(),
//!     language: "English".to_string(),
//!     initial_score: 30,
//!     final_score: 30,
//!     final_badge: "Beginner".to_string(),
//!     max_turns: 8,
//!     hint_threshold: 2,
//!     started_at: now,
//!     ended_at: now,
//!     turns: vec![],
//! };
//!
//! let report = ReportGenerator::new(input).generate().unwrap();
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.contains("# Lumen Session Report"));
//! ```

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Score below which a session is considered to have ended before the
/// student reached a working grasp of the topic.
pub const DEVELOPING_SCORE: u32 = 45;

/// Score at which the student is considered proficient.
pub const PROFICIENT_SCORE: u32 = 65;

/// Score at which the student is considered an expert.
pub const EXPERT_SCORE: u32 = 85;

/// Maximum number of characters of the question kept in the report.
const QUESTION_EXCERPT_CHARS: usize = 160;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid report data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Input Types (local copies to avoid a dependency on the tutor crate)
// ============================================================================

/// Verdict of a single scored reply.
///
/// Mirrors the tutor crate's verdict so this crate stays independent of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnVerdict {
    /// The reply showed clear understanding.
    Correct,
    /// The reply was on the right track.
    Partial,
    /// The reply was wrong, empty or confused.
    Incorrect,
}

impl TurnVerdict {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Partial => "partial",
            Self::Incorrect => "incorrect",
        }
    }

    /// Returns a display icon for Markdown output.
    #[must_use]
    pub const fn icon(&self) -> &'static str {
        match self {
            Self::Correct => "✅",
            Self::Partial => "🟡",
            Self::Incorrect => "❌",
        }
    }
}

impl std::fmt::Display for TurnVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored turn as recorded by the comprehension meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnInput {
    /// 1-based turn number.
    pub turn: u32,
    /// Score after the turn.
    pub score: u32,
    /// Configured step applied for the verdict.
    pub delta: i32,
    /// Verdict for the reply.
    pub verdict: TurnVerdict,
    /// Badge label after the turn.
    pub badge: String,
    /// Which scorer produced the verdict (`heuristic`, `model`, `model_fallback`).
    pub source: String,
    /// Evaluator feedback, when a model produced one.
    pub feedback: Option<String>,
    /// When the turn was scored.
    pub recorded_at: DateTime<Utc>,
}

/// Everything needed to build a [`Report`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInput {
    /// The question the session worked through.
    pub question_text: String,
    /// Detected subject.
    pub subject: String,
    /// Display name of the response language.
    pub language: String,
    /// Score the meter started from.
    pub initial_score: u32,
    /// Score when the session ended.
    pub final_score: u32,
    /// Badge label when the session ended.
    pub final_badge: String,
    /// Configured turn limit.
    pub max_turns: u32,
    /// Consecutive wrong answers that trigger hint mode.
    pub hint_threshold: u32,
    /// Session start.
    pub started_at: DateTime<Utc>,
    /// Session end.
    pub ended_at: DateTime<Utc>,
    /// Scored turns in order.
    pub turns: Vec<TurnInput>,
}

// ============================================================================
// Report Status
// ============================================================================

/// How the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// The student never replied.
    #[default]
    NoReplies,
    /// The student left before the turn limit.
    Ended,
    /// The session reached the configured turn limit.
    Completed,
}

impl ReportStatus {
    /// Returns a human-readable description of the status.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::NoReplies => "No replies recorded",
            Self::Ended => "Ended by the student",
            Self::Completed => "Turn limit reached",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Report
// ============================================================================

/// A complete session report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    /// Detected subject of the question.
    pub subject: String,

    /// Leading part of the question text.
    pub question_excerpt: String,

    /// Headline numbers.
    pub summary: ReportSummary,

    /// One entry per scored turn.
    pub timeline: Vec<TimelineEntry>,

    /// Study suggestions derived from the history.
    pub recommendations: Vec<Recommendation>,
}

impl Report {
    /// Creates a new builder for constructing a report.
    #[must_use]
    pub fn builder() -> ReportBuilder {
        ReportBuilder::default()
    }

    /// Serializes the report to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ReportError::from)
    }

    /// Net score change over the session.
    #[must_use]
    pub fn net_change(&self) -> i64 {
        i64::from(self.summary.final_score) - i64::from(self.summary.initial_score)
    }
}

// ============================================================================
// ReportBuilder
// ============================================================================

/// Builder for [`Report`].
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    subject: Option<String>,
    question_excerpt: Option<String>,
    summary: Option<ReportSummary>,
    timeline: Vec<TimelineEntry>,
    recommendations: Vec<Recommendation>,
}

impl ReportBuilder {
    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the question excerpt.
    #[must_use]
    pub fn question_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.question_excerpt = Some(excerpt.into());
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, summary: ReportSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Appends a timeline entry.
    #[must_use]
    pub fn timeline_entry(mut self, entry: TimelineEntry) -> Self {
        self.timeline.push(entry);
        self
    }

    /// Replaces the timeline.
    #[must_use]
    pub fn timeline(mut self, timeline: Vec<TimelineEntry>) -> Self {
        self.timeline = timeline;
        self
    }

    /// Appends a recommendation.
    #[must_use]
    pub fn recommendation(mut self, rec: Recommendation) -> Self {
        self.recommendations.push(rec);
        self
    }

    /// Replaces the recommendations.
    #[must_use]
    pub fn recommendations(mut self, recs: Vec<Recommendation>) -> Self {
        self.recommendations = recs;
        self
    }

    /// Builds the report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidData`] if `subject` or `summary` is missing.
    pub fn build(self) -> Result<Report> {
        let subject = self
            .subject
            .ok_or_else(|| ReportError::InvalidData("subject is required".to_string()))?;

        let summary = self
            .summary
            .ok_or_else(|| ReportError::InvalidData("summary is required".to_string()))?;

        Ok(Report {
            subject,
            question_excerpt: self.question_excerpt.unwrap_or_default(),
            summary,
            timeline: self.timeline,
            recommendations: self.recommendations,
        })
    }
}

// ============================================================================
// ReportSummary
// ============================================================================

/// Headline numbers for a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// How the session ended.
    pub status: ReportStatus,

    /// Response language.
    pub language: String,

    /// Number of scored turns.
    pub turns: u32,

    /// Configured turn limit.
    pub max_turns: u32,

    /// Score the meter started from.
    pub initial_score: u32,

    /// Score at the end.
    pub final_score: u32,

    /// Badge label at the end.
    pub final_badge: String,

    /// Highest score reached, including the starting score.
    pub peak_score: u32,

    /// Wall-clock length of the session.
    pub duration_seconds: u64,

    /// Turns judged correct.
    pub correct: u32,

    /// Turns judged partial.
    pub partial: u32,

    /// Turns judged incorrect.
    pub incorrect: u32,

    /// Longest run of consecutive incorrect turns.
    pub longest_wrong_streak: u32,
}

// ============================================================================
// TimelineEntry
// ============================================================================

/// One scored turn in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// When the turn was scored.
    pub timestamp: DateTime<Utc>,

    /// 1-based turn number.
    pub turn: u32,

    /// Verdict for the reply.
    pub verdict: TurnVerdict,

    /// Score after the turn.
    pub score: u32,

    /// Configured step for the verdict.
    pub delta: i32,

    /// Badge label after the turn.
    pub badge: String,

    /// Which scorer produced the verdict.
    pub source: String,

    /// Evaluator feedback, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl From<&TurnInput> for TimelineEntry {
    fn from(turn: &TurnInput) -> Self {
        Self {
            timestamp: turn.recorded_at,
            turn: turn.turn,
            verdict: turn.verdict,
            score: turn.score,
            delta: turn.delta,
            badge: turn.badge.clone(),
            source: turn.source.clone(),
            feedback: turn.feedback.clone(),
        }
    }
}

// ============================================================================
// Recommendation
// ============================================================================

/// A prioritized study suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Priority, 1 is most important.
    pub priority: u32,

    /// Short category label.
    pub category: String,

    /// The suggestion itself.
    pub description: String,
}

impl Recommendation {
    /// Creates a new recommendation.
    #[must_use]
    pub fn new(priority: u32, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            priority,
            category: category.into(),
            description: description.into(),
        }
    }
}

// ============================================================================
// ReportGenerator
// ============================================================================

/// Builds a [`Report`] from raw session data.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    input: ReportInput,
}

impl ReportGenerator {
    /// Creates a generator for the given session data.
    #[must_use]
    pub const fn new(input: ReportInput) -> Self {
        Self { input }
    }

    /// Validates the input and assembles the report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidData`] if a score exceeds 100, the session
    /// ends before it starts, or turn numbers are not consecutive from 1.
    pub fn generate(&self) -> Result<Report> {
        self.validate()?;

        let summary = self.summary();
        let recommendations = self.recommendations(&summary);
        let timeline = self.input.turns.iter().map(TimelineEntry::from).collect();

        Report::builder()
            .subject(self.input.subject.clone())
            .question_excerpt(excerpt(&self.input.question_text, QUESTION_EXCERPT_CHARS))
            .summary(summary)
            .timeline(timeline)
            .recommendations(recommendations)
            .build()
    }

    fn validate(&self) -> Result<()> {
        let input = &self.input;

        if input.initial_score > 100 || input.final_score > 100 {
            return Err(ReportError::InvalidData(format!(
                "scores must be within 0-100 (initial {}, final {})",
                input.initial_score, input.final_score
            )));
        }

        if input.ended_at < input.started_at {
            return Err(ReportError::InvalidData(
                "session ends before it starts".to_string(),
            ));
        }

        for (expected, turn) in (1u32..).zip(&input.turns) {
            if turn.turn != expected {
                return Err(ReportError::InvalidData(format!(
                    "turn {} found where turn {expected} was expected",
                    turn.turn
                )));
            }
            if turn.score > 100 {
                return Err(ReportError::InvalidData(format!(
                    "turn {} has score {} outside 0-100",
                    turn.turn, turn.score
                )));
            }
        }

        Ok(())
    }

    fn summary(&self) -> ReportSummary {
        let input = &self.input;
        let turns = u32::try_from(input.turns.len()).unwrap_or(u32::MAX);

        let status = if turns == 0 {
            ReportStatus::NoReplies
        } else if turns >= input.max_turns {
            ReportStatus::Completed
        } else {
            ReportStatus::Ended
        };

        let count = |verdict: TurnVerdict| {
            let n = input.turns.iter().filter(|t| t.verdict == verdict).count();
            u32::try_from(n).unwrap_or(u32::MAX)
        };

        let peak_score = input
            .turns
            .iter()
            .map(|t| t.score)
            .fold(input.initial_score, u32::max);

        let duration_seconds =
            u64::try_from((input.ended_at - input.started_at).num_seconds()).unwrap_or(0);

        ReportSummary {
            status,
            language: input.language.clone(),
            turns,
            max_turns: input.max_turns,
            initial_score: input.initial_score,
            final_score: input.final_score,
            final_badge: input.final_badge.clone(),
            peak_score,
            duration_seconds,
            correct: count(TurnVerdict::Correct),
            partial: count(TurnVerdict::Partial),
            incorrect: count(TurnVerdict::Incorrect),
            longest_wrong_streak: longest_wrong_streak(&input.turns),
        }
    }

    fn recommendations(&self, summary: &ReportSummary) -> Vec<Recommendation> {
        let subject = &self.input.subject;
        let mut recs = Vec::new();

        if summary.status == ReportStatus::NoReplies {
            recs.push(Recommendation::new(
                1,
                "engagement",
                "No replies were recorded. Restart the session and answer the tutor's first question.",
            ));
            return recs;
        }

        if summary.final_score < DEVELOPING_SCORE {
            recs.push(Recommendation::new(
                1,
                "fundamentals",
                format!("Revisit the fundamentals of {subject} before attempting similar questions."),
            ));
        }

        if self.input.hint_threshold > 0
            && summary.longest_wrong_streak >= self.input.hint_threshold
        {
            recs.push(Recommendation::new(
                2,
                "hints",
                format!(
                    "{} incorrect answers in a row switched the tutor to hint mode. Work through the hinted steps again on paper.",
                    summary.longest_wrong_streak
                ),
            ));
        }

        if summary.status == ReportStatus::Completed && summary.final_score < PROFICIENT_SCORE {
            recs.push(Recommendation::new(
                2,
                "pacing",
                format!(
                    "The {}-turn limit was reached before proficiency. Start a new session on the same question.",
                    summary.max_turns
                ),
            ));
        }

        let fallbacks = self
            .input
            .turns
            .iter()
            .filter(|t| t.source == "model_fallback")
            .count();
        if fallbacks > 0 {
            recs.push(Recommendation::new(
                3,
                "evaluator",
                format!(
                    "The evaluator model was unavailable for {fallbacks} turn(s), so those verdicts came from keyword matching."
                ),
            ));
        }

        if summary.final_score >= EXPERT_SCORE {
            recs.push(Recommendation::new(
                3,
                "challenge",
                format!("Comprehension reached expert level. Try a harder {subject} problem next."),
            ));
        }

        recs
    }
}

/// Longest run of consecutive incorrect turns.
fn longest_wrong_streak(turns: &[TurnInput]) -> u32 {
    let mut longest = 0u32;
    let mut current = 0u32;
    for turn in turns {
        if turn.verdict == TurnVerdict::Incorrect {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Keeps the first `max_chars` characters of the first non-empty line.
fn excerpt(text: &str, max_chars: usize) -> String {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    if line.chars().count() <= max_chars {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

// ============================================================================
// Tests
// ============================================================================
