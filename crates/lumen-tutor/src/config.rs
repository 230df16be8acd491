//! Configuration types for the Lumen tutor.
//!
//! All tunable values live here: the local model connection, the meter's
//! starting score and step sizes, the hint-escalation threshold, the
//! heuristic signal patterns and the subject keyword table.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};
use crate::language::Language;

/// The default config file name.
const CONFIG_FILE_NAME: &str = "lumen.json";

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "phi3".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    512
}

const fn default_request_timeout() -> u64 {
    60
}

/// Starting comprehension percentage for a new session.
const fn default_initial_score() -> u32 {
    30
}

const fn default_step_correct() -> i32 {
    15
}

const fn default_step_partial() -> i32 {
    7
}

const fn default_step_incorrect() -> i32 {
    -5
}

/// Consecutive wrong answers before the tutor switches to hints.
const fn default_hint_threshold() -> u32 {
    2
}

/// Back-and-forth turns in one session.
const fn default_max_turns() -> u32 {
    8
}

/// Default positive-signal patterns for the heuristic scorer.
///
/// The domain keywords are physics-flavoured sample content; deployments for
/// other subjects override them in `lumen.json`.
pub fn default_positive_patterns() -> Vec<String> {
    [
        r"\b(yes|correct|exactly|right|understand|got it|i see|makes sense)\b",
        r"\b(the formula|newton|f\s*=\s*ma|mass|acceleration|force)\b",
        r"\b(substitute|plug in|calculate|equals|result)\b",
        r"\d+\s*(m/s|kg|n|j|w|pa|k)",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Default negative-signal patterns for the heuristic scorer.
pub fn default_negative_patterns() -> Vec<String> {
    [
        r"\b(don'?t know|not sure|confused|no idea|don'?t understand|i give up)\b",
        r"\b(what|why|how)\?$",
        r"^\s*\?+\s*$",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Default subject keyword table used by subject detection.
pub fn default_subjects() -> Vec<SubjectKeywords> {
    let table: [(&str, &[&str]); 4] = [
        (
            "mathematics",
            &[
                "equation",
                "solve",
                "calculate",
                "integral",
                "derivative",
                "algebra",
                "geometry",
                "trigonometry",
                "area",
                "volume",
                "sum",
                "product",
                "fraction",
                "percentage",
                "ratio",
            ],
        ),
        (
            "physics",
            &[
                "force",
                "velocity",
                "acceleration",
                "mass",
                "gravity",
                "newton",
                "energy",
                "work",
                "power",
                "momentum",
                "wave",
                "frequency",
                "current",
                "voltage",
                "resistance",
                "ohm",
            ],
        ),
        (
            "chemistry",
            &[
                "atom", "molecule", "bond", "reaction", "element", "compound", "acid", "base",
                "mole", "periodic", "electron", "proton",
            ],
        ),
        (
            "biology",
            &[
                "cell",
                "organism",
                "dna",
                "gene",
                "photosynthesis",
                "respiration",
                "ecosystem",
                "evolution",
                "mitosis",
                "meiosis",
            ],
        ),
    ];

    table
        .into_iter()
        .map(|(name, keywords)| SubjectKeywords {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        })
        .collect()
}

/// Main configuration for Lumen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Language the tutor answers in unless a session overrides it.
    #[serde(default)]
    pub language: Language,

    /// Connection settings for the local Ollama server.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Comprehension meter tuning.
    #[serde(default)]
    pub meter: MeterConfig,

    /// Socratic escalation settings.
    #[serde(default)]
    pub socratic: SocraticConfig,

    /// Reply-scoring settings.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Keyword table for subject detection, in tie-break order.
    #[serde(default = "default_subjects")]
    pub subjects: Vec<SubjectKeywords>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::default(),
            ollama: OllamaConfig::default(),
            meter: MeterConfig::default(),
            socratic: SocraticConfig::default(),
            scoring: ScoringConfig::default(),
            subjects: default_subjects(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `lumen.json`; returns defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or validated.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            TutorError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `lumen.json` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or validated.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigParseError` for unreadable files or invalid
    /// JSON, and `TutorError::ConfigValidationError` or
    /// `TutorError::InvalidPattern` if the values do not validate.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(TutorError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TutorError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigValidationError` for out-of-range values and
    /// `TutorError::InvalidPattern` for signal patterns that do not compile.
    pub fn validate(&self) -> Result<()> {
        if self.ollama.base_url.trim().is_empty() {
            return Err(TutorError::config_validation(
                "ollama.baseUrl must not be empty",
                "Set ollama.baseUrl to your Ollama server, e.g. http://localhost:11434",
            ));
        }

        if self.ollama.model.trim().is_empty() {
            return Err(TutorError::config_validation(
                "ollama.model must not be empty",
                "Set ollama.model to an installed model name, e.g. phi3",
            ));
        }

        if !(0.0..=2.0).contains(&self.ollama.temperature) {
            return Err(TutorError::config_validation(
                format!(
                    "ollama.temperature must be between 0 and 2 (got {})",
                    self.ollama.temperature
                ),
                "Set ollama.temperature to a value such as 0.7 in your lumen.json",
            ));
        }

        if self.ollama.timeout_seconds == 0 {
            return Err(TutorError::config_validation(
                "ollama.timeoutSeconds must be greater than 0",
                "Set ollama.timeoutSeconds to at least 1 second in your lumen.json",
            ));
        }

        if self.meter.initial_score > 100 {
            return Err(TutorError::config_validation(
                format!(
                    "meter.initialScore must be between 0 and 100 (got {})",
                    self.meter.initial_score
                ),
                "Set meter.initialScore to a percentage in your lumen.json",
            ));
        }

        if self.socratic.hint_threshold == 0 {
            return Err(TutorError::config_validation(
                "socratic.hintThreshold must be greater than 0",
                "Set socratic.hintThreshold to at least 1 in your lumen.json",
            ));
        }

        if self.socratic.max_turns == 0 {
            return Err(TutorError::config_validation(
                "socratic.maxTurns must be greater than 0",
                "Set socratic.maxTurns to at least 1 in your lumen.json",
            ));
        }

        if self.scoring.positive_patterns.is_empty() {
            return Err(TutorError::config_validation(
                "scoring.positivePatterns must not be empty",
                "Provide at least one positive-signal pattern or remove the key to use the defaults",
            ));
        }

        for pattern in self
            .scoring
            .positive_patterns
            .iter()
            .chain(&self.scoring.negative_patterns)
        {
            Regex::new(pattern).map_err(|e| TutorError::invalid_pattern(pattern, e.to_string()))?;
        }

        Ok(())
    }
}

/// Connection settings for the local Ollama server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OllamaConfig {
    /// Base URL of the Ollama HTTP API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model tag to chat with.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

/// Comprehension meter tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterConfig {
    /// Score a fresh session starts from (0-100).
    #[serde(default = "default_initial_score")]
    pub initial_score: u32,

    /// Delta applied for a correct reply.
    #[serde(default = "default_step_correct")]
    pub step_correct: i32,

    /// Delta applied for a partially correct reply.
    #[serde(default = "default_step_partial")]
    pub step_partial: i32,

    /// Delta applied for an incorrect reply (usually negative).
    #[serde(default = "default_step_incorrect")]
    pub step_incorrect: i32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            initial_score: default_initial_score(),
            step_correct: default_step_correct(),
            step_partial: default_step_partial(),
            step_incorrect: default_step_incorrect(),
        }
    }
}

/// Socratic escalation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocraticConfig {
    /// Consecutive incorrect replies that switch the tutor to hint mode.
    #[serde(default = "default_hint_threshold")]
    pub hint_threshold: u32,

    /// Maximum student turns in one session.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

impl Default for SocraticConfig {
    fn default() -> Self {
        Self {
            hint_threshold: default_hint_threshold(),
            max_turns: default_max_turns(),
        }
    }
}

/// Reply-scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Ask the tutor model to grade replies, falling back to the heuristic.
    #[serde(default)]
    pub use_model: bool,

    /// Regexes that signal understanding.
    #[serde(default = "default_positive_patterns")]
    pub positive_patterns: Vec<String>,

    /// Regexes that signal confusion.
    #[serde(default = "default_negative_patterns")]
    pub negative_patterns: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            use_model: false,
            positive_patterns: default_positive_patterns(),
            negative_patterns: default_negative_patterns(),
        }
    }
}

/// Keywords that identify one academic subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectKeywords {
    /// Subject name, e.g. "physics".
    pub name: String,
    /// Lowercase keywords searched for in the question text.
    pub keywords: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.language, Language::English);
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.ollama.model, "phi3");
        assert_eq!(config.ollama.max_tokens, 512);
        assert_eq!(config.ollama.timeout_seconds, 60);
        assert_eq!(config.meter.initial_score, 30);
        assert_eq!(config.meter.step_correct, 15);
        assert_eq!(config.meter.step_partial, 7);
        assert_eq!(config.meter.step_incorrect, -5);
        assert_eq!(config.socratic.hint_threshold, 2);
        assert_eq!(config.socratic.max_turns, 8);
        assert!(!config.scoring.use_model);
        assert_eq!(config.scoring.positive_patterns.len(), 4);
        assert_eq!(config.scoring.negative_patterns.len(), 3);
    }

    #[test]
    fn test_default_subject_order() {
        let names: Vec<_> = default_subjects().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["mathematics", "physics", "chemistry", "biology"]);
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.meter.initial_score, 30);
        assert_eq!(config.subjects.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization_with_overrides() {
        let json = r#"{
            "language": "Hindi",
            "ollama": { "model": "llama3", "temperature": 0.2 },
            "meter": { "initialScore": 50, "stepIncorrect": -10 },
            "socratic": { "hintThreshold": 3 },
            "scoring": { "useModel": true, "positivePatterns": ["\\bphotosynthesis\\b"] },
            "subjects": [{ "name": "history", "keywords": ["empire", "war"] }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.language, Language::Hindi);
        assert_eq!(config.ollama.model, "llama3");
        assert!((config.ollama.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.meter.initial_score, 50);
        assert_eq!(config.meter.step_incorrect, -10);
        assert_eq!(config.meter.step_correct, 15);
        assert_eq!(config.socratic.hint_threshold, 3);
        assert_eq!(config.socratic.max_turns, 8);
        assert!(config.scoring.use_model);
        assert_eq!(config.scoring.positive_patterns.len(), 1);
        assert_eq!(config.scoring.negative_patterns.len(), 3);
        assert_eq!(config.subjects[0].name, "history");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{ "language": "tamil", "theme": "dark" }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.language, Language::Tamil);
    }

    #[test]
    fn test_invalid_language_rejected() {
        let result: std::result::Result<Config, _> = serde_json::from_str(r#"{"language": "latin"}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid language"));
    }

    #[test]
    fn test_load_from_file_nonexistent_returns_default() {
        let config = Config::load_from_file(&PathBuf::from("/nonexistent/path/lumen.json")).unwrap();
        assert_eq!(config.ollama.model, "phi3");
    }

    #[test]
    fn test_load_from_file_valid_json() {
        let config_path = std::env::temp_dir().join("test_lumen_valid.json");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(br#"{"socratic": {"maxTurns": 12}}"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.socratic.max_turns, 12);
        assert_eq!(config.socratic.hint_threshold, 2);

        std::fs::remove_file(&config_path).ok();
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let config_path = std::env::temp_dir().join("test_lumen_invalid.json");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(b"{ not valid json }").unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(
            matches!(&err, TutorError::ConfigParseError { path, message } if *path == config_path && !message.is_empty()),
            "Expected ConfigParseError with correct path, got: {err:?}"
        );

        std::fs::remove_file(&config_path).ok();
    }

    #[test]
    fn test_load_from_dir_finds_lumen_json() {
        let temp_dir = std::env::temp_dir().join("test_lumen_dir");
        std::fs::create_dir_all(&temp_dir).unwrap();
        let config_path = temp_dir.join("lumen.json");
        std::fs::write(&config_path, r#"{"language": "kn"}"#).unwrap();

        let config = Config::load_from_dir(&temp_dir).unwrap();
        assert_eq!(config.language, Language::Kannada);

        std::fs::remove_file(&config_path).ok();
        std::fs::remove_dir(&temp_dir).ok();
    }

    #[test]
    fn test_load_from_file_validates_after_parsing() {
        let config_path = std::env::temp_dir().join("test_lumen_validation.json");
        std::fs::write(&config_path, r#"{"socratic": {"hintThreshold": 0}}"#).unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(
            matches!(&err, TutorError::ConfigValidationError { .. }),
            "Expected ConfigValidationError, got: {err:?}"
        );

        std::fs::remove_file(&config_path).ok();
    }

    #[test]
    fn test_validation_initial_score_out_of_range() {
        let config = Config {
            meter: MeterConfig {
                initial_score: 101,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(&err, TutorError::ConfigValidationError { message, .. } if message.contains("initialScore")),
            "Expected ConfigValidationError about initialScore, got: {err:?}"
        );
    }

    #[test]
    fn test_validation_zero_max_turns() {
        let config = Config {
            socratic: SocraticConfig {
                max_turns: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(&err, TutorError::ConfigValidationError { message, suggestion }
                if message.contains("maxTurns") && suggestion.contains("maxTurns")),
            "Expected ConfigValidationError about maxTurns, got: {err:?}"
        );
    }

    #[test]
    fn test_validation_temperature_range() {
        let mut config = Config::default();
        config.ollama.temperature = 3.5;
        assert!(config.validate().is_err());

        config.ollama.temperature = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_model() {
        let mut config = Config::default();
        config.ollama.model = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(&err, TutorError::ConfigValidationError { message, .. } if message.contains("ollama.model")));
    }

    #[test]
    fn test_validation_invalid_pattern() {
        let mut config = Config::default();
        config.scoring.negative_patterns.push("(unclosed".to_string());
        let err = config.validate().unwrap_err();
        assert!(
            matches!(&err, TutorError::InvalidPattern { pattern, .. } if pattern == "(unclosed"),
            "Expected InvalidPattern, got: {err:?}"
        );
    }

    #[test]
    fn test_validation_empty_positive_patterns() {
        let mut config = Config::default();
        config.scoring.positive_patterns.clear();
        assert!(matches!(
            config.validate(),
            Err(TutorError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_validation_negative_patterns_may_be_empty() {
        let mut config = Config::default();
        config.scoring.negative_patterns.clear();
        assert!(config.validate().is_ok());
    }
}
