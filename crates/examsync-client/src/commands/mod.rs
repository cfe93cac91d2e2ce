//! Subcommand implementations.

pub mod auth;
pub mod config;
pub mod server;
pub mod sync;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::socket::SocketClient;

/// Socket path: command line, then `[server]`, then the default.
pub fn socket_path(cli: &Cli, config: &ClientConfig) -> PathBuf {
    cli.socket_path
        .clone()
        .or_else(|| config.server.socket_path.clone())
        .unwrap_or_else(examsync_server::default_socket_path)
}

/// Builds the daemon client from flags and configuration.
pub fn client(cli: &Cli, config: &ClientConfig) -> SocketClient {
    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.server.timeout());
    SocketClient::new(socket_path(cli, config), timeout)
}

/// Reads a payload from a file, or from stdin when no file is given.
///
/// Surrounding whitespace is dropped so a trailing newline does not make
/// an otherwise identical exam list look changed.
pub fn read_input(file: Option<&Path>) -> ClientResult<String> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    Ok(raw.trim().to_string())
}
