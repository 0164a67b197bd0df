use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod conversation;
mod error;
mod events;
mod llm;
mod prompts;
mod session;
mod streaming;
mod ui;

use config::Config;

#[derive(Parser)]
#[command(name = "dut-advisor")]
#[command(version = "0.1.0")]
#[command(about = "Admissions assistant for Da Nang University of Technology", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to ~/.dut-advisor/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat screen
    Chat,
    /// Ask one question and stream the answer to stdout
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// List the suggested questions
    Suggestions,
}

fn init_logging(config: &Config) -> Result<()> {
    let log_dir = config.log_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("dut-advisor.log"))
        .context("Failed to open log file")?;

    // The TUI owns the terminal, so logs only go to the file
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dut_advisor=info")),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config)?;

    tracing::info!(model = %config.model, "starting");

    match cli.command {
        None | Some(Commands::Chat) => ui::run(&config).await,
        Some(Commands::Ask { prompt }) => commands::ask(&config, &prompt.join(" ")).await,
        Some(Commands::Suggestions) => {
            commands::list_suggestions();
            Ok(())
        }
    }
}
