//! Comprehension meter for a tutoring session.
//!
//! The meter keeps a 0-100 comprehension score, counts consecutive incorrect
//! replies and records one [`TurnRecord`] per student turn. Classification of
//! the reply itself is delegated to a [`ScoringStrategy`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MeterConfig;
use crate::scoring::{Assessment, ScoreSource, ScoringStrategy};

// ============================================================================
// Verdict
// ============================================================================

/// Classification of one student reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The reply shows the concept was understood.
    Correct,
    /// The reply is on the right track.
    Partial,
    /// The reply shows confusion or carries no signal.
    Incorrect,
}

impl Verdict {
    /// Returns the snake_case label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Partial => "partial",
            Self::Incorrect => "incorrect",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MeterConfig {
    /// Returns the configured score delta for a verdict.
    #[must_use]
    pub const fn step_for(&self, verdict: Verdict) -> i32 {
        match verdict {
            Verdict::Correct => self.step_correct,
            Verdict::Partial => self.step_partial,
            Verdict::Incorrect => self.step_incorrect,
        }
    }
}

// ============================================================================
// Badge
// ============================================================================

/// Mastery tier shown next to the comprehension gauge.
///
/// Variants are declared from lowest to highest so the derived `Ord` follows
/// the tier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    /// Score below 25.
    NeedsHelp,
    /// Score 25-44.
    Beginner,
    /// Score 45-64.
    Developing,
    /// Score 65-84.
    Proficient,
    /// Score 85 and above.
    Expert,
}

impl Badge {
    /// Maps a comprehension score onto its badge.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen_tutor::Badge;
    ///
    /// assert_eq!(Badge::from_score(0), Badge::NeedsHelp);
    /// assert_eq!(Badge::from_score(45), Badge::Developing);
    /// assert_eq!(Badge::from_score(100), Badge::Expert);
    /// ```
    #[must_use]
    pub const fn from_score(score: u32) -> Self {
        match score {
            85.. => Self::Expert,
            65..=84 => Self::Proficient,
            45..=64 => Self::Developing,
            25..=44 => Self::Beginner,
            _ => Self::NeedsHelp,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NeedsHelp => "Needs Help",
            Self::Beginner => "Beginner",
            Self::Developing => "Developing",
            Self::Proficient => "Proficient",
            Self::Expert => "Expert",
        }
    }

    /// Emoji shown beside the label in the terminal.
    #[must_use]
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::NeedsHelp => "🆘",
            Self::Beginner => "🌱",
            Self::Developing => "📚",
            Self::Proficient => "✅",
            Self::Expert => "🌟",
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// TurnRecord
// ============================================================================

/// Snapshot of the meter after one student turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRecord {
    /// Turn number (1-indexed).
    pub turn: u32,

    /// Score after this turn, 0-100.
    pub score: u32,

    /// Configured step for the verdict. The score itself may have moved
    /// less when it hit a bound.
    pub delta: i32,

    /// Classification of the reply.
    pub verdict: Verdict,

    /// Badge for the new score.
    pub badge: Badge,

    /// Which scorer produced the verdict.
    pub source: ScoreSource,

    /// Evaluator feedback, when the tutor model graded the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,

    /// When the turn was recorded.
    pub recorded_at: DateTime<Utc>,
}

// ============================================================================
// UnderstandingMeter
// ============================================================================

/// Per-session comprehension state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderstandingMeter {
    /// Current score, always within 0-100.
    pub score: u32,

    /// Student turns scored so far.
    pub turn_count: u32,

    /// Consecutive incorrect replies.
    pub wrong_streak: u32,

    /// One record per turn, oldest first.
    pub history: Vec<TurnRecord>,

    /// When the meter was created or last reset.
    pub started_at: DateTime<Utc>,

    /// When the meter last changed.
    pub updated_at: DateTime<Utc>,

    #[serde(skip)]
    config: MeterConfig,
}

impl Default for UnderstandingMeter {
    fn default() -> Self {
        Self::new(MeterConfig::default())
    }
}

impl UnderstandingMeter {
    /// Creates a meter at the configured initial score.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen_tutor::{MeterConfig, UnderstandingMeter};
    ///
    /// let meter = UnderstandingMeter::new(MeterConfig::default());
    /// assert_eq!(meter.score, 30);
    /// assert_eq!(meter.turn_count, 0);
    /// assert!(meter.history.is_empty());
    /// ```
    #[must_use]
    pub fn new(config: MeterConfig) -> Self {
        let now = Utc::now();
        Self {
            score: config.initial_score.min(100),
            turn_count: 0,
            wrong_streak: 0,
            history: Vec::new(),
            started_at: now,
            updated_at: now,
            config,
        }
    }

    /// Returns the meter's tuning.
    #[must_use]
    pub const fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Scores a reply with `strategy` and applies the result.
    pub async fn update(
        &mut self,
        reply: &str,
        concept: &str,
        strategy: &dyn ScoringStrategy,
    ) -> TurnRecord {
        let assessment = strategy.assess(reply, concept).await;
        self.apply(assessment)
    }

    /// Applies an assessment: bumps the turn, updates the streak, moves the
    /// score by the configured step and appends a record.
    pub fn apply(&mut self, assessment: Assessment) -> TurnRecord {
        let Assessment {
            verdict,
            source,
            feedback,
        } = assessment;

        let delta = self.config.step_for(verdict);

        self.turn_count += 1;
        if verdict == Verdict::Incorrect {
            self.wrong_streak += 1;
        } else {
            self.wrong_streak = 0;
        }

        let moved = (i64::from(self.score) + i64::from(delta)).clamp(0, 100);
        self.score = u32::try_from(moved).unwrap_or(0);

        let badge = Badge::from_score(self.score);
        let record = TurnRecord {
            turn: self.turn_count,
            score: self.score,
            delta,
            verdict,
            badge,
            source,
            feedback,
            recorded_at: Utc::now(),
        };

        self.history.push(record.clone());
        self.updated_at = record.recorded_at;

        tracing::info!(
            turn = record.turn,
            verdict = %verdict,
            delta,
            score = self.score,
            badge = %badge,
            source = %source,
            "Meter updated"
        );

        record
    }

    /// Restores the initial score and clears turns, streak and history.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Badge for the current score.
    #[must_use]
    pub const fn badge(&self) -> Badge {
        Badge::from_score(self.score)
    }

    /// Highest score reached, including the starting score.
    #[must_use]
    pub fn peak_score(&self) -> u32 {
        self.history
            .iter()
            .map(|r| r.score)
            .fold(self.config.initial_score.min(100), u32::max)
    }

    /// Number of turns with the given verdict.
    #[must_use]
    pub fn count_verdict(&self, verdict: Verdict) -> usize {
        self.history.iter().filter(|r| r.verdict == verdict).count()
    }

    /// Longest run of consecutive incorrect replies in the history.
    #[must_use]
    pub fn longest_wrong_streak(&self) -> u32 {
        let mut longest = 0;
        let mut current = 0;
        for record in &self.history {
            if record.verdict == Verdict::Incorrect {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }

    /// Time since the meter was created or reset.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

// ============================================================================
// Tests
// ============================================================================
