use std::fmt;
use std::sync::Arc;

use quiz_core::model::{AttemptId, Question, QuestionId, SessionSettings, TimerScope};
use services::{
    ActiveQuiz, Clock, HostError, HttpQuizBackend, InMemoryBackend, QuizApiConfig, QuizBackend,
    QuizOutcome, QuizSessionHost, QuizUpdate, SessionEffect,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingAttempt,
    InvalidThreshold { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingAttempt => write!(f, "--attempt (or QUIZ_ATTEMPT_ID) is required"),
            ArgsError::InvalidThreshold { raw } => write!(f, "invalid --warn-at value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run  --attempt <id> [--base-url <url>] [options]");
    eprintln!("  cargo run -p app -- demo [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --per-question        enforce per-question time allotments");
    eprintln!("  --persist             post each answer as soon as it is given");
    eprintln!("  --warn-at <secs,...>  remaining-time warnings (default 300,60)");
    eprintln!();
    eprintln!("While answering: type an option number or its text, `h` for a hint,");
    eprintln!("`r` to retry a failed submission, `q` to quit.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_API_BASE_URL, QUIZ_API_TOKEN, QUIZ_ATTEMPT_ID, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

struct Args {
    attempt_id: Option<AttemptId>,
    base_url: Option<String>,
    settings: SessionSettings,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut attempt_id = std::env::var("QUIZ_ATTEMPT_ID")
            .ok()
            .map(AttemptId::new)
            .filter(|id| !id.is_blank());
        let mut base_url = None;
        let mut scope = TimerScope::QuizWide;
        let mut persist = false;
        let mut thresholds = SessionSettings::default().warning_thresholds_secs().to_vec();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--attempt" => attempt_id = Some(AttemptId::new(require_value(args, "--attempt")?)),
                "--base-url" => base_url = Some(require_value(args, "--base-url")?),
                "--per-question" => scope = TimerScope::PerQuestion,
                "--persist" => persist = true,
                "--warn-at" => {
                    let value = require_value(args, "--warn-at")?;
                    thresholds = value
                        .split(',')
                        .map(|part| part.trim().parse::<u32>())
                        .collect::<Result<_, _>>()
                        .map_err(|_| ArgsError::InvalidThreshold { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg).into()),
            }
        }

        Ok(Self {
            attempt_id,
            base_url,
            settings: SessionSettings::new(scope, thresholds, persist)?,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(log_fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn demo_backend() -> Result<(InMemoryBackend, AttemptId), Box<dyn std::error::Error>> {
    let attempt_id = AttemptId::new("demo");
    let questions = vec![
        Question::new(
            QuestionId::new("q1"),
            "Which keyword declares an immutable binding in Rust?",
            vec!["let".into(), "mut".into(), "var".into()],
            "let",
            10,
        )?
        .with_hint("Bindings are immutable unless marked otherwise."),
        Question::new(
            QuestionId::new("q2"),
            "Which trait enables the `?` operator to convert errors?",
            vec!["Into".into(), "From".into(), "AsRef".into()],
            "From",
            10,
        )?
        .with_time_allotment(30),
        Question::new(
            QuestionId::new("q3"),
            "What does `Option::take` leave behind?",
            vec!["None".into(), "Some(())".into(), "a default".into()],
            "None",
            10,
        )?,
    ];
    let backend = InMemoryBackend::new();
    backend.seed_session(attempt_id.clone(), questions, 300)?;
    Ok((backend, attempt_id))
}

fn render_question(quiz: &ActiveQuiz) {
    let session = quiz.session();
    let Some(question) = session.current_question() else {
        return;
    };
    println!();
    println!(
        "Question {}/{}  ({}s left)",
        session.current_index() + 1,
        session.total_questions(),
        session.quiz_remaining_secs()
    );
    if let Some(secs) = session.question_remaining_secs() {
        println!("  {secs}s for this question");
    }
    println!("{}", question.text());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
    if session.is_hint_visible() {
        if let Some(hint) = session.hint_text() {
            println!("  hint: {hint}");
        }
    }
}

fn resolve_answer(quiz: &ActiveQuiz, input: &str) -> Option<String> {
    let question = quiz.session().current_question()?;
    if let Ok(n) = input.parse::<usize>() {
        return question.options().get(n.checked_sub(1)?).cloned();
    }
    Some(input.to_string())
}

fn print_outcome(outcome: &QuizOutcome) {
    let result = &outcome.result;
    println!();
    println!("Quiz {:?}: score {:.1}%", outcome.status, result.score);
    println!(
        "  {}/{} correct, {}/{} points, {:.1}s per question",
        result.statistics.correct_answers,
        result.statistics.total_questions,
        result.points_earned,
        result.points_possible,
        result.statistics.avg_time_per_question
    );
    for response in &result.responses {
        println!("  {}: {}", response.question_id, response.feedback);
    }
}

/// Print what an action changed; returns the outcome once the quiz is graded.
fn report(quiz: &ActiveQuiz, update: Result<QuizUpdate, HostError>) -> Option<QuizOutcome> {
    let update = match update {
        Ok(update) => update,
        Err(err) => {
            println!("! submission failed: {err}");
            if quiz.session().status().is_terminal() {
                println!("  type `r` to retry or `q` to quit");
            } else {
                println!("  type `r` to resend that answer");
            }
            return None;
        }
    };

    let mut moved = false;
    for effect in &update.effects {
        match effect {
            SessionEffect::TimeWarning { remaining_secs } => {
                println!("! {remaining_secs} seconds remaining");
            }
            SessionEffect::QuestionTimedOut { .. } => println!("! time is up for this question"),
            SessionEffect::Expired(_) => println!("! quiz time expired"),
            SessionEffect::Rejected(err) => println!("! {err}"),
            SessionEffect::Advanced { .. } => moved = true,
            _ => {}
        }
    }
    if moved {
        render_question(quiz);
    }
    update.outcome
}

async fn drive(mut quiz: ActiveQuiz) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    render_question(&quiz);
    quiz.start_ticker();

    loop {
        tokio::select! {
            Some(()) = quiz.next_tick() => {
                let update = quiz.tick().await;
                if let Some(outcome) = report(&quiz, update) {
                    print_outcome(&outcome);
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    let session = quiz.abandon();
                    info!(attempt = %session.attempt_id(), "input closed");
                    break;
                };
                match line.trim() {
                    "" => {}
                    "q" => {
                        let _ = quiz.abandon();
                        break;
                    }
                    "h" => {
                        if quiz.session().is_hint_visible() {
                            quiz.dismiss_hint();
                        } else {
                            quiz.show_hint();
                        }
                        render_question(&quiz);
                    }
                    "r" => {
                        let update = quiz.retry_submission().await;
                        if let Some(outcome) = report(&quiz, update) {
                            print_outcome(&outcome);
                            break;
                        }
                    }
                    input => {
                        let Some(answer) = resolve_answer(&quiz, input) else {
                            println!("! no such option");
                            continue;
                        };
                        quiz.select_answer(answer);
                        let update = quiz.submit_answer().await;
                        if let Some(outcome) = report(&quiz, update) {
                            print_outcome(&outcome);
                            break;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let (backend, attempt_id): (Arc<dyn QuizBackend>, AttemptId) = match cmd {
        Command::Run => {
            let attempt_id = parsed.attempt_id.ok_or(ArgsError::MissingAttempt)?;
            let config = match parsed.base_url {
                Some(url) => QuizApiConfig::new(url, std::env::var("QUIZ_API_TOKEN").ok())?,
                None => QuizApiConfig::from_env()?,
            };
            (Arc::new(HttpQuizBackend::new(config)), attempt_id)
        }
        Command::Demo => {
            let (backend, attempt_id) = demo_backend()?;
            (Arc::new(backend), attempt_id)
        }
    };

    let host = QuizSessionHost::new(Clock::default(), backend).with_settings(parsed.settings);
    let quiz = host.start(&attempt_id).await?;
    drive(quiz).await
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
