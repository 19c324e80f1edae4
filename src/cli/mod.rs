//! CLI module - Command-line interface for qrsync
//!
//! The default command runs the interactive flow; the others expose single
//! store operations for scripting and diagnostics.

mod commands;
pub mod interactive;

use crate::config::Config;
use crate::store::{MemoryBackend, RecordStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// qrsync - move QR content between devices with a PIN and two letters
#[derive(Parser)]
#[command(name = "qrsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search paths
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep records in this process only (no backend)
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the interactive scan / protect / retrieve flow
    Run {
        /// Use this text as the first scanned payload
        #[arg(long)]
        payload: Option<String>,
    },

    /// Protect a payload with a PIN and two letters
    Store {
        payload: String,

        #[arg(long)]
        pin: String,

        #[arg(long)]
        letters: String,
    },

    /// Retrieve the latest payload stored under a PIN and letters
    Fetch {
        #[arg(long)]
        pin: String,

        #[arg(long)]
        letters: String,
    },

    /// Retrieve a payload by record id, PIN and letters
    Get {
        id: String,

        #[arg(long)]
        pin: String,

        #[arg(long)]
        letters: String,
    },

    /// Delete a record by id
    #[command(alias = "rm")]
    Delete { id: String },

    /// Delete every expired record
    Sweep,

    /// Check the backend connection (select, insert, delete)
    Check,

    /// Store and read back sample payloads
    Selftest,

    /// Create a default config file
    Init,
}

pub async fn dispatch(cli: Cli, config: Config) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Commands::Run { payload: None });

    if matches!(command, Commands::Init) {
        return commands::cmd_init();
    }

    let store = build_store(&config, cli.memory)?;

    match command {
        Commands::Run { payload } => interactive::run(&config, store, payload).await,
        Commands::Store {
            payload,
            pin,
            letters,
        } => commands::cmd_store(&store, &payload, &pin, &letters).await,
        Commands::Fetch { pin, letters } => commands::cmd_fetch(&store, &pin, &letters).await,
        Commands::Get { id, pin, letters } => {
            commands::cmd_get(&store, &id, &pin, &letters).await
        }
        Commands::Delete { id } => commands::cmd_delete(&store, &id).await,
        Commands::Sweep => commands::cmd_sweep(&store).await,
        Commands::Check => commands::cmd_check(&config, &store).await,
        Commands::Selftest => commands::cmd_selftest(&store).await,
        Commands::Init => commands::cmd_init(),
    }
}

fn build_store(config: &Config, memory: bool) -> anyhow::Result<RecordStore> {
    if memory {
        return Ok(RecordStore::new(Arc::new(MemoryBackend::new()))
            .with_ttl(config.session.ttl()));
    }
    RecordStore::from_config(config)
}
