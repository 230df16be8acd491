//! Lumen CLI
//!
//! Terminal front end for the Lumen Socratic tutor: interactive chat over
//! stdin/stdout, the HTTP API server, and an environment check.

use std::io::Write as _;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use lumen_report::{
    json::JsonGenerator, MarkdownGenerator, ReportGenerator, ReportInput, TurnInput, TurnVerdict,
};
use lumen_tutor::{
    build_ollama_tutoring, create_router, AppState, Config, Emotion, Language, OllamaClient,
    Question, ScoringStrategy, TurnRecord, TutorModel, TutoringSession, Verdict,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 3000;

/// Prefix of the report files written into the report directory.
const REPORT_PREFIX: &str = "lumen-report";

/// Lumen - offline Socratic tutor
///
/// Guides a student through a question one step at a time, tracking how
/// well they understand it and adapting the teaching style as they go.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (default: lumen.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tutor one question interactively in the terminal
    Chat(ChatArgs),

    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
    },

    /// Check the configuration and the Ollama server
    Check,
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Text file holding the question (default: read the first paragraph from stdin)
    #[arg(value_name = "QUESTION_FILE")]
    question_file: Option<PathBuf>,

    /// Response language (english, hindi, kannada, tamil, telugu or ISO code)
    #[arg(short, long, value_parser = parse_language)]
    language: Option<Language>,

    /// Initial emotion label, as an emotion poller would report it
    #[arg(short, long)]
    emotion: Option<String>,

    /// Grade replies with the tutor model instead of keyword matching
    #[arg(long)]
    model_scoring: bool,

    /// Write Markdown and JSON session reports into this directory
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,
}

fn parse_language(s: &str) -> Result<Language, String> {
    Language::parse(s).ok_or_else(|| {
        format!("unknown language '{s}' (expected english, hindi, kannada, tamil or telugu)")
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?cli.config, "Config file");

    let result = match cli.command {
        Command::Chat(args) => run_chat(cli.config.as_deref(), args).await,
        Command::Serve { port, host } => run_serve(cli.config.as_deref(), host, port).await,
        Command::Check => run_check(cli.config.as_deref()).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

// ============================================================================
// chat
// ============================================================================

/// Everything the chat loop needs besides the session itself.
struct ChatContext {
    tutor: Arc<dyn TutorModel>,
    scorer: Arc<dyn ScoringStrategy>,
    language: Option<Language>,
    hint_threshold: u32,
    report_dir: Option<PathBuf>,
    /// Questions finished so far in this run.
    finished: u32,
}

/// What the student asked for at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    Status,
    New,
    Mood(&'a str),
    Help,
    Reply(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(c, r)| (c, r.trim()));

        match command {
            "/quit" | "/exit" => Self::Quit,
            "/status" => Self::Status,
            "/new" => Self::New,
            "/mood" => Self::Mood(rest),
            "/help" => Self::Help,
            _ => Self::Reply(line),
        }
    }
}

async fn run_chat(config_path: Option<&str>, args: ChatArgs) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if args.model_scoring {
        config.scoring.use_model = true;
    }
    config.validate()?;

    let client = OllamaClient::new(&config.ollama);
    if !client.is_available().await {
        println!(
            "Ollama is not reachable at {}. Using built-in demo replies.",
            client.base_url()
        );
    }

    let (tutor, scorer) = build_ollama_tutoring(client, &config.scoring)?;
    let mut ctx = ChatContext {
        tutor,
        scorer,
        language: args.language,
        hint_threshold: config.socratic.hint_threshold,
        report_dir: args.report_dir,
        finished: 0,
    };

    let mut session = TutoringSession::new(&config);
    if let Some(label) = args.emotion.as_deref() {
        session.set_emotion(Emotion::from_label(label));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let question = match args.question_file {
        Some(path) => Question::load(path)?.text,
        None => {
            println!("Paste the question, then an empty line:");
            read_paragraph(&mut lines).await?
        }
    };

    open_session(&mut session, &ctx, &question).await?;
    println!("Type your answer, or /help for commands.");

    loop {
        prompt("> ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Input::parse(&line) {
            Input::Quit => break,
            Input::Help => print_help(),
            Input::Status => print_status(&session),
            Input::Mood(label) => {
                let emotion = Emotion::from_label(label);
                session.set_emotion(emotion);
                println!("Emotion set to {emotion}. Next mode: {}", session.current_mode());
            }
            Input::New => {
                finish_session(&session, &mut ctx)?;
                println!("Paste the next question, then an empty line:");
                let question = read_paragraph(&mut lines).await?;
                open_session(&mut session, &ctx, &question).await?;
            }
            Input::Reply("") => {}
            Input::Reply(reply) => {
                match session
                    .submit_reply(reply, ctx.scorer.as_ref(), ctx.tutor.as_ref())
                    .await
                {
                    Ok(outcome) => {
                        print_record(&outcome.record);
                        println!();
                        println!("Lumen [{}]: {}", outcome.mode, outcome.tutor_reply);
                        println!();
                        if outcome.session_complete {
                            println!(
                                "That was the last turn for this question. Use /new for another or /quit to finish."
                            );
                        }
                    }
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    finish_session(&session, &mut ctx)?;
    Ok(())
}

async fn open_session(
    session: &mut TutoringSession,
    ctx: &ChatContext,
    question: &str,
) -> anyhow::Result<()> {
    let opening = session
        .begin(question, ctx.language, ctx.tutor.as_ref())
        .await?;

    println!();
    println!(
        "Subject: {} | Language: {} | Comprehension: {}%",
        opening.subject,
        session.language().display_name(),
        session.meter().score
    );
    println!();
    println!("Lumen [{}]: {}", opening.mode, opening.tutor_reply);
    println!();
    Ok(())
}

/// Prints the summary and writes reports for the session, if it ran.
fn finish_session(session: &TutoringSession, ctx: &mut ChatContext) -> anyhow::Result<()> {
    if !session.is_active() {
        return Ok(());
    }

    ctx.finished += 1;
    print_summary(session);

    if let Some(dir) = &ctx.report_dir {
        generate_reports(session, ctx.hint_threshold, dir, ctx.finished)?;
    }
    Ok(())
}

/// Reads lines until the first blank line after some text, or end of input.
async fn read_paragraph(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<String> {
    let mut text = String::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            if text.is_empty() {
                continue;
            }
            break;
        }
        text.push_str(&line);
        text.push('\n');
    }

    if text.trim().is_empty() {
        anyhow::bail!("No question text given\n\nSuggestion: Paste the question or pass a QUESTION_FILE");
    }
    Ok(text)
}

fn prompt(label: &str) -> anyhow::Result<()> {
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /mood <label>  set the detected emotion (happy, sad, angry, fear, neutral, ...)");
    println!("  /status        show comprehension, badge and mode");
    println!("  /new           start a new question");
    println!("  /quit          end the session");
}

fn print_record(record: &TurnRecord) {
    println!(
        "[{}] {:+} -> {}% {} {}",
        record.verdict,
        record.delta,
        record.score,
        record.badge.emoji(),
        record.badge
    );
    if let Some(feedback) = &record.feedback {
        println!("  {feedback}");
    }
}

fn print_status(session: &TutoringSession) {
    let status = session.status();
    println!("Subject: {}", status.subject);
    println!("Language: {}", status.language.display_name());
    println!(
        "Comprehension: {}% {} {}",
        status.score,
        status.badge.emoji(),
        status.badge
    );
    println!("Turns: {}/{}", status.turn_count, status.max_turns);
    println!("Wrong streak: {}", status.wrong_streak);
    println!("Emotion: {}", status.emotion);
    println!("Next mode: {}", status.mode);
}

fn print_summary(session: &TutoringSession) {
    let meter = session.meter();
    println!();
    println!("Session summary:");
    println!("  Subject: {}", session.subject());
    println!("  Turns: {}", meter.turn_count);
    println!(
        "  Final comprehension: {}% {} {}",
        meter.score,
        meter.badge().emoji(),
        meter.badge()
    );
    println!("  Peak: {}%", meter.peak_score());
    println!("  Time: {}s", meter.elapsed().num_seconds().max(0));
    println!(
        "  Verdicts: {} correct, {} partial, {} incorrect",
        meter.count_verdict(Verdict::Correct),
        meter.count_verdict(Verdict::Partial),
        meter.count_verdict(Verdict::Incorrect)
    );
}

// ============================================================================
// Reports
// ============================================================================

/// File stem for one question's reports.
///
/// The start time keeps separate runs apart and the index keeps questions
/// from the same run apart.
fn report_stem(session: &TutoringSession, index: u32) -> String {
    format!(
        "{REPORT_PREFIX}-{}-q{index}",
        session.meter().started_at.format("%Y%m%d-%H%M%S")
    )
}

fn generate_reports(
    session: &TutoringSession,
    hint_threshold: u32,
    output_dir: &Path,
    index: u32,
) -> anyhow::Result<()> {
    println!();
    println!("Generating reports...");

    let input = create_report_input(session, hint_threshold);
    let report = ReportGenerator::new(input).generate()?;

    std::fs::create_dir_all(output_dir)?;

    let markdown = MarkdownGenerator::new(&report).generate();
    let stem = report_stem(session, index);
    let md_path = output_dir.join(format!("{stem}.md"));
    std::fs::write(&md_path, markdown)?;
    println!("  Markdown report: {}", md_path.display());

    let json_path = output_dir.join(format!("{stem}.json"));
    JsonGenerator::new(&report).write_to_file(&json_path, true)?;
    println!("  JSON report: {}", json_path.display());

    for rec in &report.recommendations {
        println!("  - {}", rec.description);
    }

    Ok(())
}

/// Converts session state into the report crate's input type.
fn create_report_input(session: &TutoringSession, hint_threshold: u32) -> ReportInput {
    let meter = session.meter();
    ReportInput {
        question_text: session.question_text().to_string(),
        subject: session.subject().to_string(),
        language: session.language().name().to_string(),
        initial_score: meter.config().initial_score.min(100),
        final_score: meter.score,
        final_badge: meter.badge().label().to_string(),
        max_turns: session.max_turns(),
        hint_threshold,
        started_at: meter.started_at,
        ended_at: chrono::Utc::now(),
        turns: meter.history.iter().map(convert_turn).collect(),
    }
}

fn convert_turn(record: &TurnRecord) -> TurnInput {
    TurnInput {
        turn: record.turn,
        score: record.score,
        delta: record.delta,
        verdict: convert_verdict(record.verdict),
        badge: record.badge.label().to_string(),
        source: record.source.to_string(),
        feedback: record.feedback.clone(),
        recorded_at: record.recorded_at,
    }
}

const fn convert_verdict(verdict: Verdict) -> TurnVerdict {
    match verdict {
        Verdict::Correct => TurnVerdict::Correct,
        Verdict::Partial => TurnVerdict::Partial,
        Verdict::Incorrect => TurnVerdict::Incorrect,
    }
}

// ============================================================================
// serve
// ============================================================================

async fn run_serve(config_path: Option<&str>, host: IpAddr, port: u16) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    print_config(&config);

    let state = AppState::from_config(config)?;
    let router = create_router(state);

    let addr = SocketAddr::new(host, port);
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!();
    println!("Lumen API running on http://{addr}/api");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
}

// ============================================================================
// check
// ============================================================================

async fn run_check(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    print_config(&config);
    println!();

    let client = OllamaClient::new(&config.ollama);
    if !client.is_available().await {
        anyhow::bail!(
            "Ollama is not reachable at {}\n\nSuggestion: Install Ollama and run 'ollama serve'",
            client.base_url()
        );
    }
    println!("[ok] Ollama reachable at {}", client.base_url());

    if !client.has_model(client.model()).await? {
        anyhow::bail!(
            "Model '{}' is not installed\n\nSuggestion: Run 'ollama pull {}'",
            client.model(),
            client.model()
        );
    }
    println!("[ok] Model '{}' installed", client.model());

    println!();
    println!("Supported languages:");
    for lang in Language::ALL {
        println!("  {} ({})", lang.display_name(), lang.code());
    }

    Ok(())
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Loads configuration from the specified path or the current directory.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Language: {}", config.language.display_name());
    println!("  Ollama: {} ({})", config.ollama.base_url, config.ollama.model);
    println!(
        "  Scoring: {}",
        if config.scoring.use_model {
            "tutor model"
        } else {
            "keyword heuristic"
        }
    );
    println!(
        "  Hint after {} wrong answers, {} turns max",
        config.socratic.hint_threshold, config.socratic.max_turns
    );
    println!("  Subjects: {}", config.subjects.len());
}
