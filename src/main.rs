//! Application entry point: terminal medication assistant.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line.
//! 3. Load and validate [`AppConfig`] (defaults on first run).
//! 4. `chat`: build the completion backend and engine, then run the
//!    conversation on stdin/stdout and store the finished record.
//!    `list`: print stored medications for the configured owner.
//!    `init`: write default settings so they can be edited.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use medication_assistant::{
    assistant::{ExtractionEngine, TurnOutcome, CONFIRMATION_MESSAGE},
    config::{paths, AppConfig},
    llm::{ApiBackend, CompletionBackend, FallbackBackend},
    store::{JsonlStore, MedicationRecord, MedicationStore},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "medication-assistant", version, about = "Add medications by chatting")]
struct Cli {
    /// Settings file (defaults to the platform config directory).
    #[arg(long, env = "MEDICATION_ASSISTANT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Add a medication through the conversational assistant.
    Chat,
    /// List stored medications.
    List,
    /// Write a default settings file if none exists yet.
    Init,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

async fn run_chat(config: AppConfig, store: &dyn MedicationStore) -> Result<()> {
    let backend: Arc<dyn CompletionBackend> =
        Arc::new(FallbackBackend::new(ApiBackend::from_config(&config.llm)));
    let mut engine = ExtractionEngine::from_config(backend, &config);

    // Loading indicator: report busy states as the engine enters them.
    let mut state_rx = engine.subscribe();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            if state.is_busy() {
                eprintln!("({}...)", state.label().to_lowercase());
            }
        }
    });

    engine.start();
    if let Some(greeting) = engine.transcript().last() {
        println!("{}", greeting.content);
    }
    println!("(type 'quit' to exit, '/restart' to start over, Ctrl-C to cancel a request)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        // Ctrl-C at the prompt leaves; during a request it only cancels.
        let next = tokio::select! {
            next = lines.next_line() => next?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = next else {
            println!();
            break;
        };
        match line.trim() {
            "quit" | "exit" => break,
            "/restart" => {
                engine.start();
                println!("{}", engine.transcript().last().map_or("", |t| t.content.as_str()));
                continue;
            }
            _ => {}
        }

        let token = CancellationToken::new();
        engine.set_cancellation(token.clone());
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });

        let outcome = engine.submit_user_message(&line).await;
        ctrl_c.abort();

        match outcome {
            TurnOutcome::Continue { reply } => println!("{reply}"),
            TurnOutcome::Error { message } => println!("{message}"),
            TurnOutcome::Ignored => {}
            TurnOutcome::Cancelled => println!("(request cancelled; send your message again)"),
            TurnOutcome::Complete { draft } => {
                println!("{CONFIRMATION_MESSAGE}");
                let record = MedicationRecord::from_draft(
                    config.store.owner_id.clone(),
                    draft,
                    chrono::Utc::now(),
                );
                store
                    .insert(&record)
                    .context("failed to store medication")?;
                println!("Saved: {}", record.summary());
                break;
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

fn run_list(config: &AppConfig, store: &dyn MedicationStore) -> Result<()> {
    let records = store.list_for_owner(&config.store.owner_id)?;
    if records.is_empty() {
        println!("No medications stored yet.");
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.summary()
        );
        if let Some(notes) = record.notes.as_deref() {
            println!("    {notes}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

fn run_init(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Settings already exist at {}", path.display());
        return Ok(());
    }
    AppConfig::default()
        .save_to(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();
    let settings_file = cli.config.clone().unwrap_or_else(paths::settings_file);

    // 3. Configuration
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };
    config.validate()?;

    let store = JsonlStore::new(config.store.resolved_records_file());
    log::debug!("record store at {}", store.path().display());

    // 4. Command
    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(config, &store).await,
        Command::List => run_list(&config, &store),
        Command::Init => run_init(&settings_file),
    }
}
