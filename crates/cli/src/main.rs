//! Secondhand CLI - session reconciler developer tools.
//!
//! # Usage
//!
//! ```bash
//! # Decode a session token and check whether it has expired
//! secondhand token inspect eyJhbGciOi...
//!
//! # Check a token against a fixed instant
//! secondhand token inspect eyJhbGciOi... --now 2026-01-01T00:00:00Z
//!
//! # Replay a JSON-lines event script and print the host calls
//! secondhand replay scenario.jsonl --token eyJhbGciOi...
//! ```
//!
//! # Commands
//!
//! - `token inspect` - Decode a token's claims without verifying it
//! - `replay` - Run recorded events through the reconciler
//!
//! Logs go to stderr; command output goes to stdout.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "secondhand")]
#[command(author, version, about = "Secondhand session reconciler tools")]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with session tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Replay a JSON-lines event script through the reconciler
    Replay {
        /// Script file, one event per line
        file: PathBuf,

        /// Session token present in storage before the first event
        #[arg(long)]
        token: Option<String>,

        /// Guest cart id present in storage before the first event
        #[arg(long)]
        guest_cart: Option<String>,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Decode a token's claims and report whether it has expired
    Inspect {
        /// Raw token
        token: String,

        /// Instant to check expiry against (RFC 3339, default: now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    // Defaults to info for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "secondhand_session=info,secondhand_cli=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Token { action } => match action {
            TokenAction::Inspect { token, now } => {
                commands::token::inspect(&token, now.unwrap_or_else(Utc::now))?;
            }
        },
        Commands::Replay {
            file,
            token,
            guest_cart,
        } => {
            commands::replay::run(&file, token.as_deref(), guest_cart.as_deref()).await?;
        }
    }
    Ok(())
}
