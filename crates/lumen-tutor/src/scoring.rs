//! Reply scoring strategies.
//!
//! A [`ScoringStrategy`] turns a student reply into an [`Assessment`]. Two
//! strategies exist: [`HeuristicScorer`] counts regex signals offline, and
//! [`ModelScorer`] asks the tutor model to grade the reply, falling back to
//! the heuristic whenever the model cannot produce a usable grade.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{default_negative_patterns, default_positive_patterns, ScoringConfig};
use crate::error::{Result, TutorError};
use crate::llm::{FallbackTutor, OllamaClient, TutorModel};
use crate::meter::Verdict;
use crate::prompt::{build_evaluation_prompt, EVALUATOR_SYSTEM_PROMPT};

/// Model score at or above which a reply counts as correct.
pub const MODEL_CORRECT_THRESHOLD: u32 = 70;

/// Model score at or above which a reply counts as partially correct.
pub const MODEL_PARTIAL_THRESHOLD: u32 = 40;

// ============================================================================
// Assessment
// ============================================================================

/// Which scorer produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Regex signal counting.
    Heuristic,
    /// Graded by the tutor model.
    Model,
    /// The tutor model was asked but failed; the heuristic answered.
    ModelFallback,
}

impl std::fmt::Display for ScoreSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Heuristic => write!(f, "heuristic"),
            Self::Model => write!(f, "model"),
            Self::ModelFallback => write!(f, "model_fallback"),
        }
    }
}

/// Result of scoring one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// Classification of the reply.
    pub verdict: Verdict,
    /// Which scorer decided.
    pub source: ScoreSource,
    /// One-sentence feedback from the model evaluator, if any.
    pub feedback: Option<String>,
}

impl Assessment {
    /// Creates a heuristic assessment without feedback.
    #[must_use]
    pub const fn heuristic(verdict: Verdict) -> Self {
        Self {
            verdict,
            source: ScoreSource::Heuristic,
            feedback: None,
        }
    }
}

// ============================================================================
// ScoringStrategy
// ============================================================================

/// Classifies a student reply.
///
/// Implementations must not fail: a strategy that depends on something
/// unreliable handles the failure itself and still returns a verdict.
#[async_trait]
pub trait ScoringStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Scores `reply` as an answer about `concept`.
    async fn assess(&self, reply: &str, concept: &str) -> Assessment;
}

// ============================================================================
// HeuristicScorer
// ============================================================================

static DEFAULT_POSITIVE: Lazy<Vec<Regex>> = Lazy::new(|| compile_known(&default_positive_patterns()));
static DEFAULT_NEGATIVE: Lazy<Vec<Regex>> = Lazy::new(|| compile_known(&default_negative_patterns()));

/// Compiles patterns that are known to be valid, skipping any that are not.
fn compile_known(patterns: &[String]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| TutorError::invalid_pattern(p, e.to_string())))
        .collect()
}

/// Offline scorer that counts positive and negative regex signals.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    positive: Vec<Regex>,
    negative: Vec<Regex>,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self {
            positive: DEFAULT_POSITIVE.clone(),
            negative: DEFAULT_NEGATIVE.clone(),
        }
    }
}

impl HeuristicScorer {
    /// Creates a scorer from pattern sources.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidPattern` for the first pattern that does
    /// not compile.
    pub fn new(positive: &[String], negative: &[String]) -> Result<Self> {
        Ok(Self {
            positive: compile_all(positive)?,
            negative: compile_all(negative)?,
        })
    }

    /// Creates a scorer from the `scoring` section of the config.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidPattern` if a configured pattern is invalid.
    pub fn from_config(config: &ScoringConfig) -> Result<Self> {
        Self::new(&config.positive_patterns, &config.negative_patterns)
    }

    /// Counts matching positive and negative patterns in the lowercased reply.
    ///
    /// Each pattern counts at most once.
    #[must_use]
    pub fn count_signals(&self, reply: &str) -> (usize, usize) {
        let text = reply.to_lowercase();
        let pos = self.positive.iter().filter(|re| re.is_match(&text)).count();
        let neg = self.negative.iter().filter(|re| re.is_match(&text)).count();
        (pos, neg)
    }

    /// Classifies a reply.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen_tutor::{HeuristicScorer, Verdict};
    ///
    /// let scorer = HeuristicScorer::default();
    /// assert_eq!(scorer.classify("I don't know, I'm confused"), Verdict::Incorrect);
    /// assert_eq!(scorer.classify("   "), Verdict::Incorrect);
    /// ```
    #[must_use]
    pub fn classify(&self, reply: &str) -> Verdict {
        if reply.trim().is_empty() {
            return Verdict::Incorrect;
        }

        let (pos, neg) = self.count_signals(reply);
        if pos >= 2 && neg == 0 {
            Verdict::Correct
        } else if pos >= 1 || neg == 0 {
            Verdict::Partial
        } else {
            Verdict::Incorrect
        }
    }
}

#[async_trait]
impl ScoringStrategy for HeuristicScorer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn assess(&self, reply: &str, _concept: &str) -> Assessment {
        Assessment::heuristic(self.classify(reply))
    }
}

// ============================================================================
// ModelScorer
// ============================================================================

/// Grade returned by the evaluator model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Score clamped to 0-100.
    pub score: u32,
    /// One-sentence feedback, if the model gave one.
    pub feedback: Option<String>,
}

impl Evaluation {
    /// Maps the score onto a verdict.
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        if self.score >= MODEL_CORRECT_THRESHOLD {
            Verdict::Correct
        } else if self.score >= MODEL_PARTIAL_THRESHOLD {
            Verdict::Partial
        } else {
            Verdict::Incorrect
        }
    }
}

static CODE_FENCE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").ok());

/// Parses the evaluator's raw reply into an [`Evaluation`].
///
/// Accepts a bare JSON object, optionally wrapped in a Markdown code fence.
///
/// # Errors
///
/// Returns `TutorError::EvaluationParseError` if the text is not a JSON
/// object or its `score` field is missing or not a number.
pub fn parse_evaluation(raw: &str) -> Result<Evaluation> {
    let trimmed = raw.trim();
    let body = CODE_FENCE
        .as_ref()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str());

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| TutorError::evaluation_parse(format!("not valid JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| TutorError::evaluation_parse("expected a JSON object"))?;

    let score = object
        .get("score")
        .ok_or_else(|| TutorError::evaluation_parse("missing 'score' field"))?
        .as_f64()
        .ok_or_else(|| TutorError::evaluation_parse("'score' is not a number"))?;

    if !score.is_finite() {
        return Err(TutorError::evaluation_parse("'score' is not finite"));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = score.round().clamp(0.0, 100.0) as u32;

    let feedback = object
        .get("feedback")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    Ok(Evaluation { score, feedback })
}

/// Scorer that asks the tutor model to grade the reply.
///
/// Any failure (transport, malformed JSON, missing score) is logged and the
/// wrapped heuristic scorer answers instead.
pub struct ModelScorer {
    model: Arc<dyn TutorModel>,
    fallback: HeuristicScorer,
}

impl std::fmt::Debug for ModelScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelScorer")
            .field("model", &self.model.name())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl ModelScorer {
    /// Creates a model scorer with a heuristic fallback.
    #[must_use]
    pub fn new(model: Arc<dyn TutorModel>, fallback: HeuristicScorer) -> Self {
        Self { model, fallback }
    }

    async fn evaluate(&self, reply: &str, concept: &str) -> Result<Evaluation> {
        let prompt = build_evaluation_prompt(reply, concept);
        tracing::debug!(model = self.model.name(), prompt_len = prompt.len(), "Requesting evaluation");
        let raw = self.model.generate(EVALUATOR_SYSTEM_PROMPT, &[], &prompt).await?;
        parse_evaluation(&raw)
    }
}

#[async_trait]
impl ScoringStrategy for ModelScorer {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn assess(&self, reply: &str, concept: &str) -> Assessment {
        if reply.trim().is_empty() {
            return Assessment::heuristic(Verdict::Incorrect);
        }

        match self.evaluate(reply, concept).await {
            Ok(evaluation) => Assessment {
                verdict: evaluation.verdict(),
                source: ScoreSource::Model,
                feedback: evaluation.feedback,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Model evaluation failed, using heuristic");
                Assessment {
                    verdict: self.fallback.classify(reply),
                    source: ScoreSource::ModelFallback,
                    feedback: None,
                }
            }
        }
    }
}

/// Builds the scoring strategy selected by the config.
///
/// # Errors
///
/// Returns `TutorError::InvalidPattern` if a configured pattern is invalid.
pub fn build_scorer(
    config: &ScoringConfig,
    model: Arc<dyn TutorModel>,
) -> Result<Arc<dyn ScoringStrategy>> {
    let heuristic = HeuristicScorer::from_config(config)?;
    if config.use_model {
        Ok(Arc::new(ModelScorer::new(model, heuristic)))
    } else {
        Ok(Arc::new(heuristic))
    }
}

/// Builds the tutor and scorer for an Ollama-backed session.
///
/// The tutor answers from the demo script when Ollama fails. The scorer grades
/// with the bare client, so a failed evaluation drops to the heuristic instead
/// of consuming a scripted reply.
///
/// # Errors
///
/// Returns `TutorError::InvalidPattern` if a configured pattern is invalid.
pub fn build_ollama_tutoring(
    client: OllamaClient,
    config: &ScoringConfig,
) -> Result<(Arc<dyn TutorModel>, Arc<dyn ScoringStrategy>)> {
    let scorer = build_scorer(config, Arc::new(client.clone()))?;
    let tutor: Arc<dyn TutorModel> = Arc::new(FallbackTutor::new(client));
    Ok((tutor, scorer))
}

// ============================================================================
// Tests
// ============================================================================
