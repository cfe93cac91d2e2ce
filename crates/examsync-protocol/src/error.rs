//! Framing and serialization errors.

use thiserror::Error;

/// Result alias for framing operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Why a frame could not be produced or consumed.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The length prefix exceeds [`crate::MAX_MESSAGE_SIZE`].
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: u32, max: u32 },

    /// A zero length prefix.
    #[error("empty message")]
    EmptyMessage,

    /// The buffer ends before the frame does.
    #[error("incomplete message: expected {expected} bytes, got {received}")]
    IncompleteMessage { expected: usize, received: usize },

    /// The payload is not a valid envelope.
    #[error("invalid JSON payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer did not answer in time.
    #[error("timed out while trying to {operation}")]
    Timeout { operation: String },
}
