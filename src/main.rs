use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kanjiq::config::Config;
use kanjiq::deck;
use kanjiq::engine::kana::romaji_to_kana;
use kanjiq::engine::srs_registry::SrsRegistry;
use kanjiq::engine::subject::Subject;
use kanjiq::engine::verdict::AnswerVerdict;
use kanjiq::error::SessionError;
use kanjiq::session::Session;
use kanjiq::session::state::SessionType;
use kanjiq::store::json_store::JsonStore;
use kanjiq::store::{SessionStore, SubjectProvider};

#[derive(Parser)]
#[command(name = "kanjiq", version, about = "Spaced-repetition study sessions for kanji and vocabulary")]
struct Cli {
    #[arg(short, long, help = "Subject deck JSON to import before running")]
    deck: Option<PathBuf>,

    #[arg(long, help = "Install a bundled deck by name (see `kanjiq decks`)")]
    bundled: Option<String>,

    #[arg(long, help = "Data directory (defaults to the platform data dir)")]
    data_dir: Option<PathBuf>,

    #[arg(short, long, help = "Config file (defaults to the platform config dir)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Learn subjects that are unlocked but not started
    Lesson,
    /// Review subjects whose next review is due
    Review,
    /// Quiz on started subjects without touching their SRS stage
    SelfStudy {
        #[arg(short, long, help = "Only subjects of this level")]
        level: Option<u32>,
    },
    /// Continue the session left in progress
    Resume,
    /// Show lesson and review counts and any session in progress
    Status,
    /// Report pending items and apply queued reports to the deck
    Flush,
    /// List the decks bundled with the binary
    Decks,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kanjiq=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if cli.command == Command::Decks {
        for name in deck::available() {
            let marker = if name == deck::DEFAULT_DECK { " (default)" } else { "" };
            println!("{name}{marker}");
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let mut store = match &cli.data_dir {
        Some(dir) => JsonStore::with_base_dir(dir.clone())?,
        None => JsonStore::new()?,
    };
    if let Some(path) = &cli.deck {
        let count = store.import_deck(path)?;
        info!(count, path = %path.display(), "imported deck");
    } else if cli.bundled.is_some() || store.deck().subjects.is_empty() {
        let name = cli.bundled.as_deref().unwrap_or(deck::DEFAULT_DECK);
        store.save_deck(deck::bundled(name)?)?;
        info!(deck = name, "installed bundled deck");
    }
    let srs = SrsRegistry::with_definitions(&store.deck().srs_systems);

    if cli.command == Command::Status {
        return print_status(&store);
    }

    let base_dir = store.base_dir().to_path_buf();
    let subjects = store.all_subjects()?;
    let mut session = Session::new(config, srs.clone(), Box::new(store));
    session.load();

    match cli.command {
        Command::Resume => {
            if session.is_inactive() {
                println!("No session in progress.");
                return Ok(());
            }
        }
        Command::Flush => {
            let flushed = session.flush_pending();
            println!("Reported {flushed} pending item(s).");
        }
        Command::Lesson | Command::Review | Command::SelfStudy { .. } => {
            start_session(&mut session, cli.command, subjects)?;
        }
        Command::Status | Command::Decks => {}
    }

    if cli.command != Command::Flush {
        run(&mut session)?;
    }
    drop(session);

    let mut store = JsonStore::with_base_dir(base_dir)?;
    let applied = store.sync_reports(&srs)?;
    if applied > 0 {
        println!("Applied {applied} result(s) to the deck.");
    }
    Ok(())
}

fn start_session(session: &mut Session, command: Command, subjects: Vec<Subject>) -> Result<()> {
    let (session_type, level) = match command {
        Command::Lesson => (SessionType::Lesson, None),
        Command::Review => (SessionType::Review, None),
        Command::SelfStudy { level } => (SessionType::SelfStudy, level),
        _ => return Ok(()),
    };
    if !session.is_inactive() {
        return Err(SessionError::AlreadyActive(session.session_type()).into());
    }

    let now = Utc::now();
    let candidates: Vec<Subject> = subjects
        .into_iter()
        .filter(|s| session_type.is_eligible(s, now))
        .filter(|s| session_type != SessionType::SelfStudy || s.started_at.is_some())
        .filter(|s| level.is_none_or(|l| s.level == l))
        .collect();
    if candidates.is_empty() {
        println!("Nothing to study for a {} session.", session_type.label());
        return Ok(());
    }
    match session_type {
        SessionType::Lesson => session.start_lesson(candidates)?,
        SessionType::Review => session.start_review(candidates)?,
        _ => session.start_self_study(candidates)?,
    }
    Ok(())
}

fn print_status(store: &JsonStore) -> Result<()> {
    let now = Utc::now();
    let subjects = store.all_subjects()?;
    let lessons = subjects.iter().filter(|s| s.is_eligible_for_lesson()).count();
    let reviews = subjects.iter().filter(|s| s.is_eligible_for_review(now)).count();
    println!("Level {} of {}", store.user_level(), store.max_level_granted());
    println!("Lessons available: {lessons}");
    println!("Reviews available: {reviews}");

    let properties = store.properties()?;
    if properties.session_type != SessionType::None {
        let items = store.load_items()?;
        let finished = items.iter().filter(|i| i.is_pending() || i.is_reported()).count();
        println!(
            "Session in progress: {} ({finished}/{} items done)",
            properties.session_type.label(),
            items.len()
        );
    }
    let queued = store.pending_reports().len();
    if queued > 0 {
        println!("Results waiting to be applied: {queued}");
    }
    Ok(())
}

fn read_line(lines: &mut impl Iterator<Item = io::Result<String>>, prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_string())),
        None => Ok(None),
    }
}

fn run(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while !session.is_inactive() {
        session.choose_question();
        if session.is_finishing() {
            session.finish();
            println!("Session complete.");
            break;
        }

        if session.is_in_lesson_presentation() {
            show_lesson_item(session);
            let Some(line) = read_line(&mut lines, "[n]ext [p]revious [q]uiz > ")? else {
                break;
            };
            match line.as_str() {
                "n" => session.move_to_next_lesson_item(),
                "p" => session.move_to_previous_lesson_item(),
                "q" => session.start_quiz(),
                ":wrap" => session.wrapup(),
                ":quit" => break,
                _ => {}
            }
            continue;
        }

        let Some(q) = session.current_question() else {
            break;
        };
        let Some(subject) = session.current_subject() else {
            break;
        };
        let prompt = format!(
            "[{}] {}  {}: ",
            session.progress_text(),
            subject.characters,
            q.kind.short_title()
        );
        let Some(line) = read_line(&mut lines, &prompt)? else {
            break;
        };
        match line.as_str() {
            ":quit" => break,
            ":skip" => session.skip(),
            ":wrap" => session.wrapup(),
            ":undo" | ":putback" | ":ignore" => {
                if !undo_command(session, &line) {
                    println!("Nothing to undo.");
                }
            }
            ":dontknow" => {
                session.submit_dont_know();
                show_answers(session);
                if !after_answer(session, &mut lines)? {
                    break;
                }
            }
            answer => {
                let answer = if q.kind.is_kana() {
                    romaji_to_kana(answer)
                } else {
                    answer.to_string()
                };
                let verdict = session.submit(&answer);
                if verdict.retry {
                    println!("  Try again.");
                    continue;
                }
                show_verdict(session, &verdict);
                if !after_answer(session, &mut lines)? {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Wait for the user to move on; an undo command here applies to the answer
/// just given. Returns false when input ran out.
fn after_answer(session: &mut Session, lines: &mut impl Iterator<Item = io::Result<String>>) -> Result<bool> {
    let Some(line) = read_line(lines, "  (enter to continue) ")? else {
        return Ok(false);
    };
    if line.starts_with(':') && undo_command(session, &line) {
        if session.is_answered() {
            session.advance();
        }
        return Ok(true);
    }
    session.advance();
    Ok(true)
}

fn undo_command(session: &mut Session, command: &str) -> bool {
    if !session.can_undo() {
        return false;
    }
    match command {
        ":undo" => session.undo_and_retry(),
        ":putback" => session.undo_and_put_back(),
        ":ignore" => session.ignore(),
        _ => return false,
    }
    true
}

fn show_lesson_item(session: &Session) {
    let Some(subject) = session.current_subject() else {
        return;
    };
    println!();
    println!("[{}] {}", session.progress_text(), subject.characters);
    show_subject(subject);
}

fn show_subject(subject: &Subject) {
    let meanings: Vec<&str> = subject.meanings.iter().map(|m| m.meaning.as_str()).collect();
    println!("  Meaning: {}", meanings.join(", "));
    if !subject.readings.is_empty() {
        let readings: Vec<&str> = subject.readings.iter().map(|r| r.reading.as_str()).collect();
        println!("  Reading: {}", readings.join(", "));
    }
}

fn show_answers(session: &Session) {
    if let Some(subject) = session.current_subject() {
        show_subject(subject);
    }
}

fn show_verdict(session: &Session, verdict: &AnswerVerdict) {
    if verdict.ok {
        match (&verdict.matched_answer, verdict.near_match) {
            (Some(matched), true) => println!("  Correct (close enough to {matched})"),
            _ => println!("  Correct"),
        }
    } else {
        if let Some(digraph) = verdict.digraph {
            println!(
                "  Watch the small kana: {} and {} are different",
                digraph.regular_kana, digraph.small_kana
            );
        }
        if let Some(matched) = &verdict.matched_answer {
            println!("  Wrong: that answer belongs to {matched}");
        } else {
            println!("  Wrong");
        }
        show_answers(session);
    }
    if let Some(change) = session.stage_change() {
        let arrow = if change.promoted { "up" } else { "down" };
        println!("  {} -> {} ({arrow})", change.old_stage, change.new_stage);
    }
}
