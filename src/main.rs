//! Heronix Hub - terminal client for the Heronix school messaging hub
//!
//! One-shot commands for scripting plus a full-screen TUI.

mod api;
mod backend;
mod config;
mod hub;
mod models;
mod push;
mod tui;

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use models::{ChannelId, UserId};

#[derive(Parser)]
#[command(name = "heronix-hub")]
#[command(about = "Terminal client for the Heronix messaging hub", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the stored configuration
    Configure {
        /// Base URL of the hub REST API
        #[arg(long)]
        server: Option<String>,

        /// Push WebSocket URL (derived from the server URL when omitted)
        #[arg(long)]
        push_url: Option<String>,

        /// Bearer token
        #[arg(long)]
        token: Option<String>,

        /// Your user id on the hub
        #[arg(long)]
        user_id: Option<UserId>,

        /// Messages loaded when opening a channel
        #[arg(long)]
        history_limit: Option<usize>,
    },

    /// Show configuration and hub reachability
    Status,

    /// List channels
    Channels,

    /// Read messages from a channel
    Read {
        /// Channel ID (from `channels` output)
        channel_id: ChannelId,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Send a message
    Send {
        /// Channel ID (from `channels` output)
        #[arg(short, long)]
        to: ChannelId,

        /// Message content
        message: String,
    },

    /// Launch the terminal user interface
    Tui,
}

fn init_logging(verbose: bool, tui: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

    if tui {
        // The alternate screen owns the terminal, so logs go to a file.
        let path = Config::log_path()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
    Ok(())
}

fn configure(
    server: Option<String>,
    push_url: Option<String>,
    token: Option<String>,
    user_id: Option<UserId>,
    history_limit: Option<usize>,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(server) = server {
        config.server_url = server;
    }
    if push_url.is_some() {
        config.push_url = push_url;
    }
    if token.is_some() {
        config.token = token;
    }
    if user_id.is_some() {
        config.user_id = user_id;
    }
    if let Some(limit) = history_limit {
        config.history_limit = limit;
    }

    // Reject URLs the client could never use before persisting them.
    api::client::HubClient::with_config(&config)?;
    config.push_url()?;

    config.save()?;
    println!("Saved {}", Config::config_path()?.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, matches!(cli.command, Commands::Tui))?;

    match cli.command {
        Commands::Configure {
            server,
            push_url,
            token,
            user_id,
            history_limit,
        } => {
            configure(server, push_url, token, user_id, history_limit)?;
        }
        Commands::Status => {
            api::status().await?;
        }
        Commands::Channels => {
            tracing::info!("Fetching channels...");
            api::list_channels().await?;
        }
        Commands::Read { channel_id, limit } => {
            api::read_messages(channel_id, limit).await?;
        }
        Commands::Send { to, message } => {
            tracing::info!("Sending message...");
            api::send_message(to, &message).await?;
        }
        Commands::Tui => {
            tui::run().await?;
        }
    }

    Ok(())
}
