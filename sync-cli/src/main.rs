//! # convo-sync
//!
//! CLI tool for the convo-sync engine.
//!
//! ## Commands
//!
//! - `init`: Write a default client configuration
//! - `config`: Print the effective configuration
//! - `replay`: Feed a recorded server transcript through the engine
//!
//! ## Example
//!
//! ```bash
//! # Write client.toml for alice
//! convo-sync init --user alice
//!
//! # Show what the client would use
//! convo-sync config
//!
//! # Replay a transcript and show the commands the engine sent
//! convo-sync replay session.jsonl --commands
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::replay::ReplayOptions;

/// CLI tool for the convo-sync engine.
#[derive(Parser, Debug)]
#[command(name = "convo-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding client.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log engine activity at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default client configuration
    Init {
        /// User name to log in as
        #[arg(long, short)]
        user: Option<String>,
    },

    /// Print the effective configuration
    Config,

    /// Replay a server transcript (one JSON frame per line)
    Replay {
        /// Transcript file
        transcript: PathBuf,

        /// Log in as this user instead of the configured one
        #[arg(long, short)]
        user: Option<String>,

        /// Password sent in the login frame
        #[arg(long, default_value = "")]
        password: String,

        /// Also print every frame the engine sent
        #[arg(long)]
        commands: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    match cli.command {
        Commands::Init { user } => {
            commands::init::run(&data_dir, user.as_deref()).await?;
        }
        Commands::Config => {
            commands::config::run(&data_dir)?;
        }
        Commands::Replay {
            transcript,
            user,
            password,
            commands: show_commands,
        } => {
            let options = ReplayOptions {
                user: user.as_deref(),
                password: &password,
                show_commands,
            };
            commands::replay::run(&data_dir, &transcript, options).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for convo-sync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "convo-sync", "convo-sync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
