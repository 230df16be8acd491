//! Response languages supported by the tutor.

use serde::{Deserialize, Serialize};

/// Language the tutor must answer in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    /// English (default).
    #[default]
    English,
    /// Hindi.
    Hindi,
    /// Kannada.
    Kannada,
    /// Tamil.
    Tamil,
    /// Telugu.
    Telugu,
}

impl Language {
    /// All supported languages, in menu order.
    pub const ALL: [Self; 5] = [
        Self::English,
        Self::Hindi,
        Self::Kannada,
        Self::Tamil,
        Self::Telugu,
    ];

    /// Parses a language name or ISO code, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen_tutor::Language;
    ///
    /// assert_eq!(Language::parse("hi"), Some(Language::Hindi));
    /// assert_eq!(Language::parse("Tamil"), Some(Language::Tamil));
    /// assert_eq!(Language::parse("klingon"), None);
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Some(Self::English),
            "hindi" | "hi" => Some(Self::Hindi),
            "kannada" | "kn" => Some(Self::Kannada),
            "tamil" | "ta" => Some(Self::Tamil),
            "telugu" | "te" => Some(Self::Telugu),
            _ => None,
        }
    }

    /// ISO 639-1 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Hindi => "hi",
            Self::Kannada => "kn",
            Self::Tamil => "ta",
            Self::Telugu => "te",
        }
    }

    /// English name used inside prompts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
            Self::Kannada => "Kannada",
            Self::Tamil => "Tamil",
            Self::Telugu => "Telugu",
        }
    }

    /// Name followed by the native script, for menus.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi (हिन्दी)",
            Self::Kannada => "Kannada (ಕನ್ನಡ)",
            Self::Tamil => "Tamil (தமிழ்)",
            Self::Telugu => "Telugu (తెలుగు)",
        }
    }

    /// Reminder appended to prompts so the model keeps to this language.
    #[must_use]
    pub const fn response_reminder(&self) -> &'static str {
        match self {
            Self::English => "Please respond in English.",
            Self::Hindi => "Kripaya Hindi mein jawab dein. (Please respond in Hindi.)",
            Self::Kannada => "Dayavittu Kannada nalli uttara nidi. (Please respond in Kannada.)",
            Self::Tamil => "Thayavu seithu Tamil-il padhil kodunga. (Please respond in Tamil.)",
            Self::Telugu => "Dayachesi Telugu lo spaandhinchandi. (Please respond in Telugu.)",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid language '{s}': expected one of 'english', 'hindi', 'kannada', 'tamil', 'telugu'"
            ))
        })
    }
}

impl Serialize for Language {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.name().to_lowercase())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_codes() {
        for lang in Language::ALL {
            assert_eq!(Language::parse(lang.code()), Some(lang));
            assert_eq!(Language::parse(lang.name()), Some(lang));
            assert_eq!(Language::parse(&lang.name().to_uppercase()), Some(lang));
        }
    }

    #[test]
    fn test_serialization() {
        assert_eq!(serde_json::to_string(&Language::Kannada).unwrap(), r#""kannada""#);
        let lang: Language = serde_json::from_str(r#""TE""#).unwrap();
        assert_eq!(lang, Language::Telugu);
    }

    #[test]
    fn test_invalid_language_error() {
        let result: std::result::Result<Language, _> = serde_json::from_str(r#""french""#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid language"));
        assert!(err.contains("french"));
    }

    #[test]
    fn test_response_reminder_names_language() {
        for lang in Language::ALL {
            assert!(lang.response_reminder().contains(lang.name()));
        }
    }
}
