//! Length-prefixed message framing for IPC.
//!
//! ```text
//! +----------------+------------------+
//! | length (4 BE)  |  JSON payload    |
//! +----------------+------------------+
//! ```
//!
//! [`encode_message`] / [`decode_message`] work on complete buffers;
//! [`read_frame`] / [`write_frame`] work on a socket.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

const PREFIX_LEN: usize = 4;

/// Rejects lengths the peer may not send.
fn check_len(len: u32) -> ProtocolResult<usize> {
    match len {
        0 => Err(ProtocolError::EmptyMessage),
        len if len > MAX_MESSAGE_SIZE => Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        }),
        len => Ok(len as usize),
    }
}

/// Serializes a message and prepends its length.
///
/// ```rust
/// use examsync_protocol::{encode_message, Request, Envelope};
///
/// let bytes = encode_message(&Envelope::request("req-1", Request::Ping)).unwrap();
/// assert_eq!(u32::from_be_bytes(bytes[..4].try_into().unwrap()) as usize, bytes.len() - 4);
/// ```
pub fn encode_message<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(message)?;
    let len = u32::try_from(json.len()).unwrap_or(u32::MAX);
    check_len(len)?;

    let mut frame = Vec::with_capacity(PREFIX_LEN + json.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&json);
    Ok(frame)
}

/// Parses one complete frame. Bytes after the frame are ignored.
pub fn decode_message<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
    let Some((prefix, rest)) = data.split_first_chunk::<PREFIX_LEN>() else {
        return Err(ProtocolError::IncompleteMessage {
            expected: PREFIX_LEN,
            received: data.len(),
        });
    };

    let len = check_len(u32::from_be_bytes(*prefix))?;
    let payload = rest.get(..len).ok_or(ProtocolError::IncompleteMessage {
        expected: PREFIX_LEN + len,
        received: data.len(),
    })?;
    Ok(serde_json::from_slice(payload)?)
}

/// Reads one frame from a stream.
///
/// Returns `Ok(None)` when the peer closed the stream before sending a
/// length prefix. A stream closed mid-frame is an IO error.
pub async fn read_frame<R, T>(reader: &mut R) -> ProtocolResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; PREFIX_LEN];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = check_len(u32::from_be_bytes(prefix))?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(serde_json::from_slice(&payload)?))
}

/// Writes one frame to a stream and flushes it.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_message(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
