//! Teaching-mode selection.

use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;

/// Score below which the tutor explains from the ground up.
pub const SCAFFOLDED_BELOW: u32 = 30;

/// Score below which the tutor asks guiding questions.
pub const SOCRATIC_BELOW: u32 = 60;

/// Teaching strategy the tutor model is instructed to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachingMode {
    /// Step-by-step explanation for a struggling beginner.
    Scaffolded,
    /// Guiding questions, never the direct answer.
    Socratic,
    /// In-depth exploration for a student who has the basics.
    Deep,
    /// Simple, direct clarification after repeated mistakes or distress.
    Hint,
}

impl TeachingMode {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scaffolded => "scaffolded",
            Self::Socratic => "socratic",
            Self::Deep => "deep",
            Self::Hint => "hint",
        }
    }

    /// Uppercase label used in the system prompt.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Scaffolded => "SCAFFOLDED",
            Self::Socratic => "SOCRATIC",
            Self::Deep => "DEEP",
            Self::Hint => "HINT",
        }
    }

    /// Instruction text appended to the system prompt for this mode.
    #[must_use]
    pub const fn instruction(&self) -> &'static str {
        match self {
            Self::Scaffolded => {
                "The student is a beginner and is struggling. \
                 Explain the core concept they are stuck on step-by-step, breaking it into the simplest possible pieces. \
                 Use warm, highly encouraging language."
            }
            Self::Socratic => {
                "Ask guiding questions to help the student reach the answer themselves. \
                 Never give the direct answer. Encourage them to think critically by asking one question at a time."
            }
            Self::Deep => {
                "The student shows good understanding. Provide in-depth explanations exploring edge cases \
                 and real-world applications to expand their knowledge."
            }
            Self::Hint => {
                "The student has struggled or looks frustrated. \
                 Gently clarify their confusion with a very simple, direct explanation of the specific part they are stuck on."
            }
        }
    }
}

impl std::fmt::Display for TeachingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the teaching mode for the next tutor turn.
///
/// Hint mode wins whenever the wrong-answer streak reaches `hint_threshold`
/// or the student looks sad, angry or afraid. Otherwise the score decides.
///
/// # Examples
///
/// ```
/// use lumen_tutor::{select_mode, Emotion, TeachingMode};
///
/// assert_eq!(select_mode(20, 0, Emotion::Neutral, 2), TeachingMode::Scaffolded);
/// assert_eq!(select_mode(70, 3, Emotion::Neutral, 2), TeachingMode::Hint);
/// ```
#[must_use]
pub const fn select_mode(
    score: u32,
    wrong_streak: u32,
    emotion: Emotion,
    hint_threshold: u32,
) -> TeachingMode {
    if wrong_streak >= hint_threshold || emotion.is_distressed() {
        TeachingMode::Hint
    } else if score < SCAFFOLDED_BELOW {
        TeachingMode::Scaffolded
    } else if score < SOCRATIC_BELOW {
        TeachingMode::Socratic
    } else {
        TeachingMode::Deep
    }
}
