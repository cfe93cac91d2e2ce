//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use examsync_server::ProviderKind;

/// examsync - mirror exam reservations into your calendar
#[derive(Debug, Parser)]
#[command(name = "examsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "EXAMSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Path to the daemon socket
    #[arg(long, env = "EXAMSYNC_SOCKET", global = true)]
    pub socket_path: Option<PathBuf>,

    /// Seconds to wait for the daemon's answer
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Print daemon responses as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the daemon in the foreground
    Server,

    /// Report a freshly scraped exam list (duplicate triggers are dropped)
    Changed {
        /// File holding the JSON exam list; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Sync an exam list unconditionally
    Sync {
        /// File holding the JSON exam list; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Re-sync the last reported exam list
    ForceSync,

    /// Delete every synced event from every calendar
    DeleteSynced,

    /// Refresh provider access tokens
    RefreshTokens,

    /// Show daemon status
    Status,

    /// Check whether the daemon is running
    Ping,

    /// Stop the daemon
    Shutdown,

    /// Token management
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Provider selector for token commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    /// Microsoft Graph
    Outlook,
    /// Google Calendar
    Google,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Outlook => ProviderKind::Outlook,
            ProviderArg::Google => ProviderKind::Google,
        }
    }
}

/// Token actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Store a token obtained elsewhere (bare JSON string or token object)
    Import {
        /// Provider the token belongs to
        #[arg(value_enum)]
        provider: ProviderArg,

        /// Token file; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Show where tokens are stored and whether they are usable
    Show,

    /// Remove a stored token
    Clear {
        /// Provider whose token to remove
        #[arg(value_enum)]
        provider: ProviderArg,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,

    /// Set a `[sync]` preference, keeping the rest of the file intact
    Set {
        /// Preference name (e.g. `preferred_provider`, `calendar_name`)
        key: String,

        /// New value
        value: String,
    },
}
