//! Unix socket listener for the daemon's IPC.
//!
//! Frames are a 4-byte big-endian length followed by a JSON envelope.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use examsync_protocol::{
    Envelope, PROTOCOL_VERSION, ProtocolError, Request, Response, read_frame, write_frame,
};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Listening socket with a cap on concurrent connections.
pub struct SocketServer {
    config: ServerConfig,
    listener: UnixListener,
    connection_slots: Arc<Semaphore>,
}

impl SocketServer {
    /// Binds the configured socket path.
    ///
    /// A socket file nobody answers on is removed when
    /// `cleanup_stale_socket` is set; a live one means another daemon is
    /// running.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        let socket_path = &config.socket_path;

        if let Some(parent) = socket_path.parent()
            && !parent.exists()
        {
            return Err(ServerError::socket_path_invalid(
                parent.to_string_lossy().to_string(),
            ));
        }

        if socket_path.exists() {
            if !config.cleanup_stale_socket || UnixStream::connect(socket_path).await.is_ok() {
                return Err(ServerError::socket_in_use(
                    socket_path.to_string_lossy().to_string(),
                ));
            }
            info!(path = %socket_path.display(), "Removing stale socket");
            std::fs::remove_file(socket_path)?;
        }

        let listener = UnixListener::bind(socket_path)?;
        info!(path = %socket_path.display(), "Socket server listening");

        let connection_slots = Arc::new(Semaphore::new(config.max_connections));
        Ok(Self {
            config,
            listener,
            connection_slots,
        })
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Waits for a free slot, then accepts one connection.
    pub async fn accept(&self) -> ServerResult<Connection> {
        let permit = self
            .connection_slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ServerError::Shutdown)?;

        let (stream, _addr) = self.listener.accept().await?;
        debug!("Accepted connection");

        Ok(Connection {
            stream,
            timeout: self.config.connection_timeout,
            _permit: permit,
        })
    }

    /// Accepts connections until `shutdown` completes, spawning `handler`
    /// for each.
    pub async fn serve<F, Fut, S>(&self, handler: F, shutdown: S) -> ServerResult<()>
    where
        F: Fn(Connection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
                accepted = self.accept() => match accepted {
                    Ok(connection) => {
                        tokio::spawn(handler(connection));
                    }
                    Err(ServerError::Shutdown) => return Ok(()),
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
            }
        }
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        let path = &self.config.socket_path;
        if !path.exists() {
            return;
        }
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "Removed socket file"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove socket file"),
        }
    }
}

/// One accepted client connection.
pub struct Connection {
    stream: UnixStream,
    timeout: Duration,
    _permit: OwnedSemaphorePermit,
}

impl Connection {
    /// Reads the next request.
    ///
    /// Returns `Ok(None)` when the client closed the connection between
    /// frames.
    pub async fn read_request(&mut self) -> ServerResult<Option<Envelope<Request>>> {
        let read = read_frame::<_, Envelope<Request>>(&mut self.stream);
        let Some(envelope) = tokio::time::timeout(self.timeout, read)
            .await
            .map_err(|_| timeout("read request"))??
        else {
            return Ok(None);
        };

        if !envelope.is_compatible() {
            warn!(
                version = %envelope.protocol_version,
                expected = %PROTOCOL_VERSION,
                "Incompatible protocol version"
            );
        }
        Ok(Some(envelope))
    }

    /// Sends a response tagged with the request's id.
    pub async fn respond(
        &mut self,
        request_id: impl Into<String>,
        response: Response,
    ) -> ServerResult<()> {
        let envelope = Envelope::response(request_id, response);
        tokio::time::timeout(self.timeout, write_frame(&mut self.stream, &envelope))
            .await
            .map_err(|_| timeout("write response"))??;
        Ok(())
    }
}

fn timeout(operation: &str) -> ServerError {
    ServerError::Protocol(ProtocolError::Timeout {
        operation: operation.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn bind_creates_and_drop_removes_socket() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");

        let server = SocketServer::bind(ServerConfig::new(&socket_path))
            .await
            .unwrap();
        assert!(socket_path.exists());
        drop(server);
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn second_daemon_is_rejected() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let config = ServerConfig::new(&socket_path);

        let _server = SocketServer::bind(config.clone()).await.unwrap();
        let result = SocketServer::bind(config).await;
        assert!(matches!(result, Err(ServerError::SocketInUse { .. })));
    }

    #[tokio::test]
    async fn stale_socket_file_is_replaced() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        std::fs::write(&socket_path, b"stale").unwrap();

        let config = ServerConfig::new(&socket_path).with_cleanup_stale_socket(true);
        assert!(SocketServer::bind(config).await.is_ok());

        std::fs::write(dir.path().join("other.sock"), b"stale").unwrap();
        let config =
            ServerConfig::new(dir.path().join("other.sock")).with_cleanup_stale_socket(false);
        assert!(matches!(
            SocketServer::bind(config).await,
            Err(ServerError::SocketInUse { .. })
        ));
    }

    #[tokio::test]
    async fn missing_parent_directory_is_invalid() {
        let dir = tempdir().unwrap();
        let config = ServerConfig::new(dir.path().join("nope").join("test.sock"));
        assert!(matches!(
            SocketServer::bind(config).await,
            Err(ServerError::SocketPathInvalid { .. })
        ));
    }

    #[tokio::test]
    async fn request_response_roundtrip() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let config =
            ServerConfig::new(&socket_path).with_connection_timeout(Duration::from_secs(5));
        let server = SocketServer::bind(config).await.unwrap();

        let client_path = socket_path.clone();
        let client = tokio::spawn(async move {
            let mut stream = UnixStream::connect(&client_path).await.unwrap();
            let request = Envelope::request("req-1", Request::exam_changed("[]"));
            write_frame(&mut stream, &request).await.unwrap();

            let response: Envelope<Response> = read_frame(&mut stream).await.unwrap().unwrap();
            assert_eq!(response.request_id, "req-1");
            assert_eq!(response.payload, Response::Pong);
        });

        let mut conn = server.accept().await.unwrap();
        let request = conn.read_request().await.unwrap().unwrap();
        assert_eq!(request.payload, Request::exam_changed("[]"));
        conn.respond(&request.request_id, Response::Pong)
            .await
            .unwrap();

        client.await.unwrap();
    }

    #[tokio::test]
    async fn client_disconnect_reads_as_none() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let server = SocketServer::bind(ServerConfig::new(&socket_path))
            .await
            .unwrap();

        let client_path = socket_path.clone();
        let client = tokio::spawn(async move {
            let _stream = UnixStream::connect(&client_path).await.unwrap();
        });

        let mut conn = server.accept().await.unwrap();
        client.await.unwrap();
        assert!(conn.read_request().await.unwrap().is_none());
    }
}
