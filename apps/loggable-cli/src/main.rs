//! # loggable-cli
//!
//! Command-line interface for Loggable audit stores.
//!
//! - `loggable history`: list the log entries of one object
//! - `loggable revert`: print an object's audited fields at a version
//! - `loggable verify`: check a JSONL store's hash chain
//! - `loggable demo`: run a sample entity lifecycle through the engine
//!
//! Stores are picked by file extension: `.jsonl` opens a JSON Lines store,
//! `.db`, `.sqlite`, and `.sqlite3` open a SQLite store.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use loggable::LoggableConfig;
use tracing_subscriber::EnvFilter;

/// Inspect and replay Loggable audit trails.
#[derive(Parser)]
#[command(name = "loggable", version, about)]
struct Cli {
    /// Engine config file (TOML). Used by `demo`.
    #[arg(long, default_value = "loggable.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List an object's log entries, newest first.
    History {
        /// Path to the log store.
        #[arg(long)]
        store: PathBuf,
        /// Audited type name.
        #[arg(long)]
        class: String,
        /// Object id as recorded in the log.
        #[arg(long)]
        id: String,
        /// Print entries as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print an object's audited fields as of a version.
    Revert {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        class: String,
        #[arg(long)]
        id: String,
        /// Version to reconstruct.
        #[arg(long)]
        version: u32,
    },
    /// Verify the hash chain of a JSONL store.
    Verify {
        #[arg(long)]
        store: PathBuf,
    },
    /// Run a sample create/update/remove lifecycle through the engine.
    Demo {
        /// Store to write entries to (defaults to an in-memory store).
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("loggable=info".parse()?)
                .add_directive("loggable_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::History {
            store,
            class,
            id,
            json,
        } => commands::history::execute(store, class, id, *json),
        Commands::Revert {
            store,
            class,
            id,
            version,
        } => commands::revert::execute(store, class, id, *version),
        Commands::Verify { store } => commands::verify::execute(store),
        Commands::Demo { store } => {
            let config = if cli.config.exists() {
                LoggableConfig::load(&cli.config)?
            } else {
                commands::demo::default_config()
            };
            commands::demo::execute(config, store.as_deref())
        }
    }
}
