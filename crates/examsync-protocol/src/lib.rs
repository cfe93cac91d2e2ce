//! IPC messages between the `examsync` CLI and the sync daemon.
//!
//! Messages are length-prefixed JSON over a Unix socket:
//! - 4 bytes: message length (u32, big-endian)
//! - N bytes: JSON payload
//!
//! Every message is wrapped in an [`Envelope`] carrying the protocol
//! version and a request id used to correlate the response.
//!
//! ```rust
//! use examsync_protocol::{Envelope, Request, encode_message, decode_message};
//!
//! let request = Envelope::request("req-123", Request::ForceSync);
//! let bytes = encode_message(&request).unwrap();
//! let decoded: Envelope<Request> = decode_message(&bytes).unwrap();
//! assert_eq!(decoded.payload, Request::ForceSync);
//! ```

mod error;
mod framing;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{decode_message, encode_message, read_frame, write_frame};
pub use types::{
    DeletedEvent, Envelope, ErrorCode, ErrorResponse, ProviderStatus, Request, Response,
    StatusInfo, SyncReport, SyncSummary, UnchangedReason,
};

/// Protocol version constant.
pub const PROTOCOL_VERSION: &str = "1";

/// Maximum message size (1 MB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;
