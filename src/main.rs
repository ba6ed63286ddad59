//! chatapp - terminal chat client
//!
//! Direct messages synced through a shared document feed, plus topic forums
//! kept on this machine.

mod api;
mod auth;
mod commands;
mod config;
mod models;
mod notice;
mod services;
mod sync;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chatapp")]
#[command(about = "Terminal client for direct messages and topic forums", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with Google
    Login {
        /// Run the device flow even if a session exists
        #[arg(short, long)]
        force: bool,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show current authentication status
    Status,

    /// Show the signed-in identity
    Whoami,

    /// List other users (registers you in the directory on first use)
    Users {
        /// Filter by name or email
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Read a direct chat
    Read {
        /// The other user's uid (from `users` output)
        uid: String,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Send a direct message
    Send {
        /// Recipient uid
        #[arg(short, long)]
        to: String,

        /// File to attach
        #[arg(short, long)]
        attach: Option<PathBuf>,

        /// Message content
        message: Option<String>,
    },

    /// Follow a direct chat and print new messages
    Watch {
        /// The other user's uid
        uid: String,
    },

    /// Show the saved compose draft for a direct chat
    Draft {
        /// The other user's uid
        uid: String,
    },

    /// List forum topics
    Topics,

    /// Read or post in a forum topic
    Forum {
        #[command(subcommand)]
        action: ForumAction,
    },

    /// Launch the terminal user interface
    Tui,
}

#[derive(Subcommand)]
enum ForumAction {
    /// Print a topic's messages
    Read {
        /// Topic id (from `topics` output)
        topic: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Post to a topic
    Post {
        topic: String,

        #[arg(short, long)]
        attach: Option<PathBuf>,

        message: Option<String>,
    },
}

fn env_filter(verbose: bool) -> tracing_subscriber::EnvFilter {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into())
}

/// Install the tracing subscriber. In TUI mode the terminal belongs to the
/// UI, so log lines go to the returned in-memory buffer instead of stderr.
fn init_logging(cli: &Cli) -> Option<tui::LogBuffer> {
    if let Commands::Tui = cli.command {
        let logs = tui::LogBuffer::new();
        tracing_subscriber::registry()
            .with(env_filter(cli.verbose))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(logs.clone()),
            )
            .init();
        return Some(logs);
    }

    tracing_subscriber::registry()
        .with(env_filter(cli.verbose))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let logs = init_logging(&cli);

    match cli.command {
        Commands::Login { force } => {
            tracing::info!("Starting sign-in flow...");
            auth::login(force).await?;
        }
        Commands::Logout => {
            auth::logout().await?;
        }
        Commands::Status => {
            auth::status().await?;
        }
        Commands::Whoami => {
            commands::whoami().await?;
        }
        Commands::Users { search } => {
            commands::users(search).await?;
        }
        Commands::Read { uid, limit } => {
            commands::read(&uid, limit).await?;
        }
        Commands::Send { to, attach, message } => {
            tracing::info!("Sending message...");
            commands::send(&to, message, attach).await?;
        }
        Commands::Watch { uid } => {
            commands::watch(&uid).await?;
        }
        Commands::Draft { uid } => {
            commands::draft(&uid).await?;
        }
        Commands::Topics => {
            commands::topics();
        }
        Commands::Forum { action } => match action {
            ForumAction::Read { topic, limit } => {
                commands::forum_read(&topic, limit).await?;
            }
            ForumAction::Post {
                topic,
                attach,
                message,
            } => {
                commands::forum_post(&topic, message, attach).await?;
            }
        },
        Commands::Tui => {
            tui::run(logs.unwrap_or_default()).await?;
        }
    }

    Ok(())
}
