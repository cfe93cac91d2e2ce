//! Client error types.

use thiserror::Error;

use examsync_protocol::ErrorResponse;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A `pass::` / `env::` reference could not be resolved.
    #[error("secret error: {0}")]
    Secret(String),

    /// Provider construction or token handling failed.
    #[error("provider error: {0}")]
    Provider(#[from] examsync_providers::ProviderError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection to the daemon failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Framing or serialization error.
    #[error("protocol error: {0}")]
    Protocol(#[from] examsync_protocol::ProtocolError),

    /// Request timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The daemon answered with an error response.
    #[error("daemon error ({}): {}", .0.code.description(), .0.message)]
    Daemon(ErrorResponse),

    /// The daemon could not be started or stopped.
    #[error("server error: {0}")]
    Server(#[from] examsync_server::ServerError),
}

impl ClientError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
