//! Facial-emotion labels reported by the external emotion poller.

use serde::{Deserialize, Serialize};

/// Dominant emotion detected on the student's face.
///
/// Labels come from an external classifier. Parsing is lenient: any label
/// that is not recognised becomes [`Emotion::Neutral`] so that a new or
/// misspelled label never blocks a tutoring turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Emotion {
    /// Happy.
    Happy,
    /// Sad.
    Sad,
    /// Angry.
    Angry,
    /// Afraid.
    Fear,
    /// Surprised.
    Surprise,
    /// Disgusted.
    Disgust,
    /// No strong expression (default).
    #[default]
    Neutral,
    /// No face was found in the last frame.
    NoFace,
}

impl Emotion {
    /// Parses a classifier label, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen_tutor::Emotion;
    ///
    /// assert_eq!(Emotion::from_label("SAD"), Emotion::Sad);
    /// assert_eq!(Emotion::from_label("no_face"), Emotion::NoFace);
    /// assert_eq!(Emotion::from_label("bored"), Emotion::Neutral);
    /// ```
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().replace('-', "_").as_str() {
            "happy" => Self::Happy,
            "sad" => Self::Sad,
            "angry" => Self::Angry,
            "fear" | "afraid" => Self::Fear,
            "surprise" | "surprised" => Self::Surprise,
            "disgust" | "disgusted" => Self::Disgust,
            "no_face" | "noface" => Self::NoFace,
            _ => Self::Neutral,
        }
    }

    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fear => "fear",
            Self::Surprise => "surprise",
            Self::Disgust => "disgust",
            Self::Neutral => "neutral",
            Self::NoFace => "no_face",
        }
    }

    /// Returns `true` for the emotions that force hint mode: sad, angry, fear.
    #[must_use]
    pub const fn is_distressed(&self) -> bool {
        matches!(self, Self::Sad | Self::Angry | Self::Fear)
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Emotion {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_label(&s))
    }
}

impl Serialize for Emotion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
