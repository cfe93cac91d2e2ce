//! CLI, configuration and socket client for examsync.
//!
//! This crate provides the `examsync` binary. Most subcommands send one
//! request to the daemon over its Unix socket; `examsync server` runs the
//! daemon itself, and `auth` / `config` work on local files only.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod socket;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use socket::SocketClient;
