//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod cleanup;
mod init;
mod serve;
mod sync;

use clap::{Parser, Subcommand};

use crate::config::{ConfigArgs, Settings, DEFAULT_BIND};

#[derive(Parser)]
#[command(name = "thaigl")]
#[command(about = "Telegram-backed book library")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server with the sync and cleanup workers
    Serve {
        /// Address to listen on (host:port)
        #[arg(long, env = "THAIGL_BIND", default_value = DEFAULT_BIND)]
        bind: String,
    },

    /// Create the data directories and database
    Init,

    /// Fetch and apply pending Telegram updates once
    Sync,

    /// Run one cleanup pass and print the result
    Cleanup,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_args(cli.config);

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(settings, &bind).await,
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Sync => sync::cmd_sync(&settings).await,
        Commands::Cleanup => cleanup::cmd_cleanup(&settings).await,
    }
}
