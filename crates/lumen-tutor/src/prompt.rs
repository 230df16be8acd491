//! Prompt composition for the tutor model.
//!
//! Builds the system prompt that keeps the model in the Socratic tutor role,
//! the first user turn that presents the captured question, and the
//! evaluation prompt used by [`crate::ModelScorer`].

use std::fmt::Write as _;

use crate::config::SubjectKeywords;
use crate::emotion::Emotion;
use crate::language::Language;
use crate::mode::TeachingMode;

/// Subject reported when no keyword matches.
pub const GENERAL_SUBJECT: &str = "general";

/// System message for the evaluator model.
pub const EVALUATOR_SYSTEM_PROMPT: &str = "You are a strict but fair exam evaluator. \
Respond ONLY with valid JSON in the format: {\"score\": <0-100>, \"feedback\": \"<one sentence>\"}";

const BEHAVIOR_RULES: [&str; 7] = [
    "If the student provides a full question paper or multiple questions, FIRST ask the student which specific question they have a doubt in. Do not solve anything until they specify.",
    "If the student says they don't know anything, briefly explain the core concepts of the topic first, and then ask a guiding question.",
    "NEVER give the direct answer to the student's question.",
    "Ask one clear, guiding Socratic question at a time to lead them to the solution.",
    "Acknowledge what the student said and validate their effort.",
    "Use simple vocabulary appropriate for a school student.",
    "Keep your responses concise (1-2 short paragraphs max) to encourage dialogue.",
];

/// Everything the system prompt depends on.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Response language.
    pub language: Language,
    /// Detected subject, lowercase.
    pub subject: &'a str,
    /// Current comprehension score.
    pub score: u32,
    /// Selected teaching mode.
    pub mode: TeachingMode,
    /// Latest detected emotion.
    pub emotion: Emotion,
}

/// Builds the tutor's system prompt.
#[must_use]
pub fn build_system_prompt(ctx: &PromptContext<'_>) -> String {
    let lang = ctx.language.name();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are Lumen, an empathetic offline AI tutor specializing in {}.",
        ctx.subject
    );
    let _ = writeln!(out, "Your sole purpose is to guide students to understand concepts.");
    let _ = writeln!(out);
    let _ = writeln!(out, "LANGUAGE RULE: Always respond ONLY in {lang}.");
    let _ = writeln!(
        out,
        "If the student writes in any other language, still reply in {lang}."
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "BEHAVIOR RULES:");
    for (i, rule) in BEHAVIOR_RULES.iter().enumerate() {
        let _ = writeln!(out, "{}. {rule}", i + 1);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "CURRENT TEACHING MODE: {}", ctx.mode.label());
    let _ = writeln!(out, "{}", ctx.mode.instruction());
    let _ = writeln!(out);
    let _ = writeln!(out, "SUBJECT: {}", capitalize(ctx.subject));
    let _ = writeln!(out, "STUDENT COMPREHENSION: {}%", ctx.score);
    let _ = writeln!(
        out,
        "STUDENT EMOTION: {} (Adjust your tone accordingly)",
        ctx.emotion
    );

    out
}

/// Builds the first user turn, presenting the captured question.
#[must_use]
pub fn build_intro_message(question_text: &str, language: Language) -> String {
    format!(
        "I have this document or question paper from my textbook or homework:\n\n\
         \"{question_text}\"\n\n\
         I need help with this in {language}. How should we start?"
    )
}

/// Builds the prompt that asks the evaluator to grade a reply.
#[must_use]
pub fn build_evaluation_prompt(reply: &str, concept: &str) -> String {
    format!(
        "Evaluate the student's response below for conceptual correctness regarding '{concept}'. \
         Reply with ONLY a JSON object: {{\"score\": <0-100>, \"feedback\": \"<one sentence>\"}}.\n\n\
         Student response: \"{reply}\""
    )
}

/// Detects the academic subject of a question by keyword counting.
///
/// Each subject scores one point per keyword found as a substring of the
/// lowercased text. The highest score wins, ties go to the subject listed
/// first, and [`GENERAL_SUBJECT`] is returned when nothing matches.
///
/// # Examples
///
/// ```
/// use lumen_tutor::{default_subjects, detect_subject};
///
/// let subjects = default_subjects();
/// assert_eq!(detect_subject("A force acts on a mass", &subjects), "physics");
/// assert_eq!(detect_subject("Describe the Mughal empire", &subjects), "general");
/// ```
#[must_use]
pub fn detect_subject(text: &str, subjects: &[SubjectKeywords]) -> String {
    let lower = text.to_lowercase();

    let mut best: Option<(&str, usize)> = None;
    for subject in subjects {
        let hits = subject
            .keywords
            .iter()
            .filter(|kw| !kw.is_empty() && lower.contains(&kw.to_lowercase()))
            .count();
        if hits > best.map_or(0, |(_, n)| n) {
            best = Some((subject.name.as_str(), hits));
        }
    }

    best.map_or_else(|| GENERAL_SUBJECT.to_string(), |(name, _)| name.to_string())
}

/// Uppercases the first character and lowercases the rest.
#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_subjects;

    fn context(mode: TeachingMode) -> PromptContext<'static> {
        PromptContext {
            language: Language::Hindi,
            subject: "physics",
            score: 42,
            mode,
            emotion: Emotion::Sad,
        }
    }

    #[test]
    fn test_system_prompt_sections() {
        let prompt = build_system_prompt(&context(TeachingMode::Hint));

        assert!(prompt.starts_with("You are Lumen"));
        assert!(prompt.contains("specializing in physics"));
        assert!(prompt.contains("Always respond ONLY in Hindi."));
        assert!(prompt.contains("still reply in Hindi."));
        assert!(prompt.contains("BEHAVIOR RULES:"));
        assert!(prompt.contains("7. Keep your responses concise"));
        assert!(prompt.contains("CURRENT TEACHING MODE: HINT"));
        assert!(prompt.contains(TeachingMode::Hint.instruction()));
        assert!(prompt.contains("SUBJECT: Physics"));
        assert!(prompt.contains("STUDENT COMPREHENSION: 42%"));
        assert!(prompt.contains("STUDENT EMOTION: sad"));
    }

    #[test]
    fn test_system_prompt_follows_mode() {
        let prompt = build_system_prompt(&context(TeachingMode::Deep));
        assert!(prompt.contains("CURRENT TEACHING MODE: DEEP"));
        assert!(!prompt.contains(TeachingMode::Scaffolded.instruction()));
    }

    #[test]
    fn test_intro_message() {
        let msg = build_intro_message("What is 2 + 2?", Language::Tamil);
        assert!(msg.contains("\"What is 2 + 2?\""));
        assert!(msg.contains("in Tamil"));
        assert!(msg.ends_with("How should we start?"));
    }

    #[test]
    fn test_evaluation_prompt() {
        let prompt = build_evaluation_prompt("F equals m a", "Newton's second law");
        assert!(prompt.contains("regarding 'Newton's second law'"));
        assert!(prompt.contains(r#"{"score": <0-100>, "feedback": "<one sentence>"}"#));
        assert!(prompt.ends_with("Student response: \"F equals m a\""));
    }

    #[test]
    fn test_evaluator_system_prompt_requests_json() {
        assert!(EVALUATOR_SYSTEM_PROMPT.contains("ONLY with valid JSON"));
    }

    #[test]
    fn test_detect_subject() {
        let subjects = default_subjects();
        assert_eq!(
            detect_subject("Balance the REACTION between an acid and a base", &subjects),
            "chemistry"
        );
        assert_eq!(
            detect_subject("Explain photosynthesis in a plant cell", &subjects),
            "biology"
        );
        assert_eq!(detect_subject("Write an essay", &subjects), "general");
        assert_eq!(detect_subject("", &subjects), "general");
    }

    #[test]
    fn test_detect_subject_tie_goes_to_first() {
        let subjects = default_subjects();
        // one mathematics keyword ("solve") and one physics keyword ("force")
        assert_eq!(detect_subject("solve for the force", &subjects), "mathematics");
    }

    #[test]
    fn test_detect_subject_custom_table() {
        let subjects = vec![SubjectKeywords {
            name: "history".to_string(),
            keywords: vec!["Empire".to_string(), "war".to_string()],
        }];
        assert_eq!(detect_subject("The empire went to war", &subjects), "history");
        assert_eq!(detect_subject("", &[]), "general");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("physics"), "Physics");
        assert_eq!(capitalize("GENERAL"), "General");
        assert_eq!(capitalize(""), "");
    }
}
