//! PokeRAG CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write a default config file
//! - `serve`: Start the HTTP API server
//! - `ask`: Interactive chat or single-question mode
//! - `ingest`: Load Pokemon records or documents into the vector store
//! - `check`: Diagnose configuration and collaborator health
//! - `config`: Show, locate or validate the configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "pokerag",
    about = "PokeRAG: retrieval-augmented Pokemon assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to config.toml (defaults to ~/.pokerag/config.toml)
    #[arg(short, long, global = true, env = "POKERAG_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask questions about Pokemon
    Ask {
        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Ingest a Pokemon JSON file or a directory of documents
    Ingest {
        /// A JSON array of Pokemon records, or a directory of .txt/.md/.json files
        path: PathBuf,

        /// Maximum items to ingest (0 uses the configured default)
        #[arg(short, long, default_value_t = 0)]
        limit: usize,

        /// Items to skip before ingesting
        #[arg(short, long, default_value_t = 0)]
        start_from: usize,
    },

    /// Diagnose configuration and collaborator health
    Check,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with secrets redacted
    Show,
    /// Print the default config file path
    Path,
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Ask { message } => commands::ask::run(config_path, message).await?,
        Commands::Ingest {
            path,
            limit,
            start_from,
        } => commands::ingest::run(config_path, &path, limit, start_from).await?,
        Commands::Check => commands::check::run(config_path).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
        },
    }

    Ok(())
}
