//! End-to-end tests for a tutoring session
//!
//! These tests drive a session from a question file and a config fixture
//! through scored turns to the generated reports. The tutor is either the
//! scripted demo tutor or a fallback tutor pointed at an unreachable Ollama
//! server, so no model needs to be installed.

use std::path::PathBuf;

use lumen_report::{
    json::JsonGenerator, MarkdownGenerator, ReportGenerator, ReportInput, ReportStatus, TurnInput,
    TurnVerdict,
};
use lumen_tutor::{
    build_ollama_tutoring, Config, DemoTutor, Emotion, FallbackTutor, HeuristicScorer, Language,
    OllamaClient, Question, ScoreSource, TeachingMode, TurnRecord, TutorError, TutoringSession,
    Verdict,
};

/// Path to the sample question fixture directory.
fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-question")
}

fn fixture_config() -> Config {
    Config::load_from_dir(&fixture_dir()).expect("Failed to load config fixture")
}

fn fixture_question() -> Question {
    Question::load(fixture_dir().join("question.txt")).expect("Failed to load question fixture")
}

fn to_report_input(session: &TutoringSession, config: &Config) -> ReportInput {
    let meter = session.meter();
    ReportInput {
        question_text: session.question_text().to_string(),
        subject: session.subject().to_string(),
        language: session.language().name().to_string(),
        initial_score: config.meter.initial_score,
        final_score: meter.score,
        final_badge: meter.badge().label().to_string(),
        max_turns: session.max_turns(),
        hint_threshold: config.socratic.hint_threshold,
        started_at: meter.started_at,
        ended_at: chrono::Utc::now(),
        turns: meter.history.iter().map(to_turn_input).collect(),
    }
}

fn to_turn_input(record: &TurnRecord) -> TurnInput {
    TurnInput {
        turn: record.turn,
        score: record.score,
        delta: record.delta,
        verdict: match record.verdict {
            Verdict::Correct => TurnVerdict::Correct,
            Verdict::Partial => TurnVerdict::Partial,
            Verdict::Incorrect => TurnVerdict::Incorrect,
        },
        badge: record.badge.label().to_string(),
        source: record.source.to_string(),
        feedback: record.feedback.clone(),
        recorded_at: record.recorded_at,
    }
}

#[test]
fn test_sample_config_loads() {
    let config = fixture_config();

    assert_eq!(config.language, Language::Hindi);
    assert_eq!(config.ollama.base_url, "http://127.0.0.1:9");
    assert_eq!(config.ollama.timeout_seconds, 5);
    assert_eq!(config.meter.initial_score, 40);
    assert_eq!(config.meter.step_correct, 15);
    assert_eq!(config.socratic.max_turns, 3);
    assert!(!config.scoring.use_model);
    assert_eq!(config.subjects.len(), 4);
}

#[test]
fn test_sample_question_is_normalised() {
    let question = fixture_question();

    assert_eq!(
        question.text.lines().next(),
        Some("Q3. A force of 20 N acts on a body of mass 4 kg.")
    );
    assert_eq!(question.text.lines().count(), 3);
    assert!(question.source.is_some());
}

#[test]
fn test_missing_question_file() {
    let err = Question::load(fixture_dir().join("missing.txt")).unwrap_err();
    assert!(matches!(err, TutorError::QuestionNotFound { .. }));
}

/// Full walk: two wrong answers trigger hint mode, a correct one recovers,
/// and the turn limit closes the session.
#[tokio::test]
async fn test_full_session_with_report() {
    let config = fixture_config();
    let question = fixture_question();
    let tutor = DemoTutor::new();
    let scorer = HeuristicScorer::from_config(&config.scoring).expect("Invalid patterns");

    let mut session = TutoringSession::new(&config);
    let opening = session
        .begin(&question.text, None, &tutor)
        .await
        .expect("Failed to open session");

    assert_eq!(opening.subject, "physics");
    assert_eq!(opening.mode, TeachingMode::Socratic);
    assert_eq!(session.language(), Language::Hindi);
    assert!(session.system_prompt().contains("Always respond ONLY in Hindi."));

    let first = session
        .submit_reply("I don't know", &scorer, &tutor)
        .await
        .expect("Turn 1 failed");
    assert_eq!(first.record.verdict, Verdict::Incorrect);
    assert_eq!(first.record.score, 35);
    assert_eq!(first.mode, TeachingMode::Socratic);

    let second = session
        .submit_reply("no idea, I'm confused", &scorer, &tutor)
        .await
        .expect("Turn 2 failed");
    assert_eq!(second.record.score, 30);
    assert_eq!(second.mode, TeachingMode::Hint);

    let third = session
        .submit_reply("Yes! F = ma, so acceleration is 20/4 = 5 m/s²", &scorer, &tutor)
        .await
        .expect("Turn 3 failed");
    assert_eq!(third.record.verdict, Verdict::Correct);
    assert_eq!(third.record.score, 45);
    assert_eq!(third.record.source, ScoreSource::Heuristic);
    assert_eq!(third.mode, TeachingMode::Socratic);
    assert!(third.session_complete);

    let err = session
        .submit_reply("one more", &scorer, &tutor)
        .await
        .unwrap_err();
    assert!(matches!(err, TutorError::SessionComplete { max_turns: 3 }));

    // Report
    let report = ReportGenerator::new(to_report_input(&session, &config))
        .generate()
        .expect("Failed to generate report");

    assert_eq!(report.subject, "physics");
    assert_eq!(report.summary.status, ReportStatus::Completed);
    assert_eq!(report.summary.language, "Hindi");
    assert_eq!(report.summary.turns, 3);
    assert_eq!(report.summary.correct, 1);
    assert_eq!(report.summary.incorrect, 2);
    assert_eq!(report.summary.longest_wrong_streak, 2);
    assert_eq!(report.summary.peak_score, 45);
    assert_eq!(report.summary.final_badge, "Developing");
    assert!(report.recommendations.iter().any(|r| r.category == "hints"));
    assert!(report.recommendations.iter().any(|r| r.category == "pacing"));

    let markdown = MarkdownGenerator::new(&report).generate();
    assert!(markdown.contains("# Lumen Session Report: Physics"));
    assert!(markdown.contains("| Turns | 3 of 3 |"));
    assert!(markdown.contains("| Comprehension | 40% → 45% (+5) |"));
    assert!(markdown.contains("## Timeline"));
    assert!(markdown.contains("## Recommendations"));

    let json = JsonGenerator::new(&report).generate().expect("JSON failed");
    let value: serde_json::Value = serde_json::from_str(&json).expect("Invalid JSON");
    assert_eq!(value["timeline"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["timeline"][2]["verdict"], "correct");
}

#[tokio::test]
async fn test_reports_written_to_directory() {
    let config = fixture_config();
    let tutor = DemoTutor::new();
    let scorer = HeuristicScorer::default();
    let mut session = TutoringSession::new(&config);
    session
        .begin(&fixture_question().text, Some(Language::English), &tutor)
        .await
        .expect("Failed to open session");
    session
        .submit_reply("The formula is F = ma", &scorer, &tutor)
        .await
        .expect("Turn failed");

    let report = ReportGenerator::new(to_report_input(&session, &config))
        .generate()
        .expect("Failed to generate report");

    let dir = std::env::temp_dir().join(format!("lumen-it-reports-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("Failed to create dir");

    let md_path = dir.join("lumen-report.md");
    std::fs::write(&md_path, MarkdownGenerator::new(&report).generate()).expect("Write failed");
    let json_path = dir.join("lumen-report.json");
    JsonGenerator::new(&report)
        .write_to_file(&json_path, true)
        .expect("Write failed");

    let md = std::fs::read_to_string(&md_path).expect("Read failed");
    assert!(md.contains("| Status | Ended by the student |"));
    let json = std::fs::read_to_string(&json_path).expect("Read failed");
    assert!(json.contains("\"status\": \"ended\""));

    std::fs::remove_dir_all(&dir).expect("Cleanup failed");
}

/// With Ollama unreachable the fallback tutor answers from the demo script.
#[tokio::test]
async fn test_unreachable_ollama_falls_back_to_demo() {
    let config = fixture_config();
    let client = OllamaClient::new(&config.ollama);
    assert!(!client.is_available().await);

    let tutor = FallbackTutor::new(client);
    let expected = DemoTutor::new().next_response();

    let mut session = TutoringSession::new(&config);
    let opening = session
        .begin(&fixture_question().text, None, &tutor)
        .await
        .expect("Fallback should answer");

    assert_eq!(opening.tutor_reply, expected);
}

/// Model scoring against a dead server falls back to the heuristic without
/// taking lines from the demo script, so the tutor replies stay in order.
#[tokio::test]
async fn test_model_scoring_offline_keeps_demo_order() {
    let mut config = fixture_config();
    config.scoring.use_model = true;
    let (tutor, scorer) =
        build_ollama_tutoring(OllamaClient::new(&config.ollama), &config.scoring)
            .expect("Invalid patterns");

    let script = DemoTutor::new();
    let expected: Vec<String> = (0..3).map(|_| script.next_response()).collect();

    let mut session = TutoringSession::new(&config);
    let opening = session
        .begin(&fixture_question().text, None, tutor.as_ref())
        .await
        .expect("Failed to open session");
    assert_eq!(opening.tutor_reply, expected[0]);

    let first = session
        .submit_reply("F = ma", scorer.as_ref(), tutor.as_ref())
        .await
        .expect("Turn 1 failed");
    assert_eq!(first.record.source, ScoreSource::ModelFallback);
    assert_eq!(first.tutor_reply, expected[1]);

    let second = session
        .submit_reply("so the acceleration is 5 m/s²", scorer.as_ref(), tutor.as_ref())
        .await
        .expect("Turn 2 failed");
    assert_eq!(second.record.source, ScoreSource::ModelFallback);
    assert_eq!(second.tutor_reply, expected[2]);
}

#[tokio::test]
async fn test_emotion_and_new_question() {
    let config = fixture_config();
    let tutor = DemoTutor::new();
    let scorer = HeuristicScorer::default();
    let mut session = TutoringSession::new(&config);

    session.set_emotion(Emotion::from_label("FEAR"));
    let opening = session
        .begin(&fixture_question().text, None, &tutor)
        .await
        .expect("Failed to open session");
    assert_eq!(opening.mode, TeachingMode::Hint);

    session
        .submit_reply("mass times acceleration", &scorer, &tutor)
        .await
        .expect("Turn failed");
    assert_eq!(session.meter().turn_count, 1);

    // A new question resets the meter but keeps the student's emotion
    let opening = session
        .begin("Balance this acid and base reaction", None, &tutor)
        .await
        .expect("Failed to open second session");
    assert_eq!(opening.subject, "chemistry");
    assert_eq!(session.meter().turn_count, 0);
    assert_eq!(session.meter().score, 40);
    assert_eq!(session.emotion(), Emotion::Fear);
}
