//! # TaskDesk
//!
//! Terminal front end for the TaskDesk task manager: register, log in, then
//! add, list, search and complete personal tasks.
//!
//! ## Usage
//!
//! ```bash
//! # PostgreSQL from DATABASE_URL / TASKDESK_* settings
//! cargo run -p taskdesk-cli
//!
//! # Throwaway in-memory store
//! cargo run -p taskdesk-cli -- --memory
//! ```

mod shell;

use anyhow::Context;
use clap::Parser;
use std::io::Write;
use taskdesk_shared::config::AppConfig;
use taskdesk_shared::models::task::CompletionPolicy;
use taskdesk_shared::storage::Storage;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shell::{Command, Reply, Shell};

/// Personal task manager
#[derive(Parser, Debug)]
#[command(name = "taskdesk", version, about = "Personal task manager")]
struct Cli {
    /// Keep everything in memory instead of PostgreSQL
    #[arg(long)]
    memory: bool,

    /// PostgreSQL connection string (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// What `done-text` does with several matching tasks: all or first
    #[arg(long)]
    completion_policy: Option<CompletionPolicy>,
}

async fn open_storage(cli: &Cli) -> anyhow::Result<Storage> {
    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    if let Some(policy) = cli.completion_policy {
        config.completion_policy = policy;
    }

    if cli.memory {
        tracing::info!("Using in-memory storage, nothing will be saved");
        return Ok(Storage::in_memory()
            .with_password_config(config.password)
            .with_completion_policy(config.completion_policy));
    }

    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
    Storage::connect(&config)
        .await
        .context("Failed to open storage")
}

fn prompt(shell: &Shell) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    match shell.current_user() {
        Some(user) => write!(stdout, "{}> ", user)?,
        None => write!(stdout, "> ")?,
    }
    stdout.flush()
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Line(String),
    /// The line was consumed but could not be decoded
    NotUtf8,
    End,
}

async fn read_input<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> std::io::Result<Input> {
    match lines.next_line().await {
        Ok(Some(line)) => Ok(Input::Line(line)),
        Ok(None) => Ok(Input::End),
        Err(err) if err.kind() == std::io::ErrorKind::InvalidData => Ok(Input::NotUtf8),
        Err(err) => Err(err),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't mix with command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdesk_cli=info,taskdesk_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tracing::info!("TaskDesk v{} starting...", env!("CARGO_PKG_VERSION"));

    let storage = open_storage(&cli).await?;
    let mut shell = Shell::new(storage.clone());

    println!("Type 'help' for the list of commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt(&shell)?;
        let line = match read_input(&mut lines).await? {
            Input::Line(line) => line,
            Input::NotUtf8 => {
                println!("Input is not valid UTF-8, line ignored");
                continue;
            }
            Input::End => break,
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{}", err);
                continue;
            }
        };

        match shell.execute(command).await {
            Ok(Reply::Lines(output)) => {
                for line in output {
                    println!("{}", line);
                }
            }
            Ok(Reply::Quit) => break,
            Err(err) if err.is_fatal() => {
                tracing::error!(error = %err, "Storage failure");
                println!("Error: {}", err);
            }
            Err(err) => println!("{}", err),
        }
    }

    storage.close().await;
    tracing::info!("Shutdown, exiting...");
    Ok(())
}
