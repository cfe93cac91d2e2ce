//! Server error types.

use std::io;
use thiserror::Error;

use examsync_core::MalformedExamData;
use examsync_protocol::{ErrorCode, ErrorResponse};
use examsync_providers::{ProviderError, ProviderErrorCode};

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (socket, file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error (framing, encoding, etc.).
    #[error("Protocol error: {0}")]
    Protocol(#[from] examsync_protocol::ProtocolError),

    /// Socket path already in use.
    #[error("Socket path already in use: {path}")]
    SocketInUse { path: String },

    /// Socket path parent directory does not exist.
    #[error("Socket path parent directory does not exist: {path}")]
    SocketPathInvalid { path: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Shutdown requested.
    #[error("Server shutdown requested")]
    Shutdown,
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a socket in use error.
    pub fn socket_in_use(path: impl Into<String>) -> Self {
        Self::SocketInUse { path: path.into() }
    }

    /// Creates a socket path invalid error.
    pub fn socket_path_invalid(path: impl Into<String>) -> Self {
        Self::SocketPathInvalid { path: path.into() }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failures that abort a whole sync or sweep.
///
/// Per-event failures never surface here; they are logged and counted.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No usable access token for the provider.
    #[error("no token for {provider}")]
    NoToken { provider: String },

    /// The exam payload is not a JSON array of exam records.
    #[error(transparent)]
    MalformedExamData(#[from] MalformedExamData),

    /// The preferred provider has no adapter configured.
    #[error("provider {provider} is not configured")]
    ProviderNotConfigured { provider: String },

    /// Force sync was requested before any exam list was received.
    #[error("no stored exam state to sync")]
    NoExamState,

    /// Calendar resolution or event listing failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The state or preference store could not be read or written.
    #[error("store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Creates a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Returns the IPC error code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoToken { .. } => ErrorCode::NoToken,
            Self::MalformedExamData(_) => ErrorCode::MalformedExamData,
            Self::ProviderNotConfigured { .. } | Self::NoExamState => ErrorCode::InvalidRequest,
            Self::Provider(e) => match e.code() {
                ProviderErrorCode::AuthenticationFailed => ErrorCode::AuthenticationFailed,
                ProviderErrorCode::RateLimited => ErrorCode::RateLimited,
                ProviderErrorCode::NotFound => ErrorCode::NotFound,
                _ => ErrorCode::ProviderError,
            },
            Self::Store(_) => ErrorCode::InternalError,
        }
    }
}

impl From<SyncError> for ErrorResponse {
    fn from(err: SyncError) -> Self {
        ErrorResponse::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_error_codes() {
        let err = SyncError::NoToken {
            provider: "outlook".into(),
        };
        assert_eq!(err.code(), ErrorCode::NoToken);
        assert_eq!(err.to_string(), "no token for outlook");

        let err: SyncError = ProviderError::authentication("expired").into();
        assert_eq!(err.code(), ErrorCode::AuthenticationFailed);

        let err: SyncError = ProviderError::server("boom").into();
        assert_eq!(err.code(), ErrorCode::ProviderError);
    }

    #[test]
    fn malformed_payload_maps_to_error_response() {
        let err: SyncError = examsync_core::parse_exam_payload("{}").unwrap_err().into();
        let response = ErrorResponse::from(err);
        assert_eq!(response.code, ErrorCode::MalformedExamData);
    }
}
