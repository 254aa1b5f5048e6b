mod commands;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coderun_sandbox::{Dispatcher, SandboxConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "coderun")]
#[command(about = "Run short programs through a language interpreter with a deadline")]
#[command(version)]
pub struct Cli {
    /// Config file (default: <config dir>/coderun/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute code and print the result as JSON
    Run {
        /// Language tag (javascript, python; shell when configured)
        #[arg(short, long)]
        language: String,

        /// Read code from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Caller identity used in the temp file name
        #[arg(short, long, default_value = coderun_sandbox::ANONYMOUS)]
        user: String,
    },
    /// List supported languages and their interpreters
    Languages,
    /// Start the HTTP front end
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:4000")]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config =
        SandboxConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let dispatcher = Dispatcher::new(config).context("Failed to create dispatcher")?;

    match cli.command {
        Commands::Run {
            language,
            file,
            user,
        } => commands::execute_run(&dispatcher, language, file, user).await,
        Commands::Languages => {
            commands::execute_languages(&dispatcher);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { bind } => {
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;
            server::start_server(listener, dispatcher).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Logs go to stderr; stdout carries results only
fn init_tracing(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "coderun={},coderun_sandbox={}",
                    log_level, log_level
                ))
            }),
        )
        .init();
}
