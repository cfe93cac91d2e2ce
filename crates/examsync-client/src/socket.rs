//! Unix socket client for the examsync daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UnixStream;
use tracing::{debug, warn};
use uuid::Uuid;

use examsync_protocol::{Envelope, Request, Response, read_frame, write_frame};

use crate::error::{ClientError, ClientResult};

/// Sends one request per connection and waits for the answer.
#[derive(Debug, Clone)]
pub struct SocketClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl SocketClient {
    /// Creates a client.
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends a request and returns the daemon's response.
    ///
    /// Error responses are returned as [`ClientError::Daemon`].
    pub async fn send(&self, request: Request) -> ClientResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        debug!(
            socket = %self.socket_path.display(),
            request_id = %request_id,
            request = request.kind(),
            "sending request"
        );

        let mut stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| ClientError::Timeout("connecting to daemon".into()))?
            .map_err(|e| {
                ClientError::Connection(format!(
                    "failed to connect to {} (is `examsync server` running?): {}",
                    self.socket_path.display(),
                    e
                ))
            })?;

        let envelope = Envelope::request(&request_id, request);
        tokio::time::timeout(self.timeout, write_frame(&mut stream, &envelope))
            .await
            .map_err(|_| ClientError::Timeout("sending request".into()))??;

        let envelope: Envelope<Response> =
            tokio::time::timeout(self.timeout, read_frame(&mut stream))
                .await
                .map_err(|_| ClientError::Timeout("waiting for response".into()))??
                .ok_or_else(|| {
                    ClientError::Connection("daemon closed the connection without answering".into())
                })?;

        if envelope.request_id != request_id {
            warn!(
                expected = %request_id,
                received = %envelope.request_id,
                "response request_id mismatch"
            );
        }

        match envelope.payload {
            Response::Error { error } => Err(ClientError::Daemon(error)),
            response => Ok(response),
        }
    }

    /// Returns true if a daemon answers on the socket.
    pub async fn ping(&self) -> bool {
        matches!(self.send(Request::Ping).await, Ok(Response::Pong))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examsync_protocol::ErrorCode;
    use tokio::net::UnixListener;

    /// Answers one request with `response`.
    async fn serve_once(listener: UnixListener, response: Response) -> Request {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request: Envelope<Request> = read_frame(&mut stream).await.unwrap().unwrap();
        let reply = Envelope::response(&request.request_id, response);
        write_frame(&mut stream, &reply).await.unwrap();
        request.payload
    }

    #[tokio::test]
    async fn request_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let server = tokio::spawn(serve_once(listener, Response::Pong));

        let client = SocketClient::new(&path, Duration::from_secs(5));
        assert!(client.ping().await);
        assert_eq!(server.await.unwrap(), Request::Ping);
    }

    #[tokio::test]
    async fn error_response_becomes_daemon_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.sock");
        let listener = UnixListener::bind(&path).unwrap();
        tokio::spawn(serve_once(
            listener,
            Response::error(ErrorCode::NoToken, "no token for outlook"),
        ));

        let client = SocketClient::new(&path, Duration::from_secs(5));
        match client.send(Request::ForceSync).await {
            Err(ClientError::Daemon(error)) => assert_eq!(error.code, ErrorCode::NoToken),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_socket_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = SocketClient::new(dir.path().join("none.sock"), Duration::from_secs(1));
        assert!(matches!(
            client.send(Request::Status).await,
            Err(ClientError::Connection(_))
        ));
        assert!(!client.ping().await);
    }
}
