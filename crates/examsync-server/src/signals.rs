//! Shutdown coordination.
//!
//! SIGTERM and SIGINT, as well as a `shutdown` request, flip one watch
//! channel that the accept loop waits on.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::error::ServerResult;

/// Cloneable trigger and observer of daemon shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    /// Creates a handle in the running state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests shutdown.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once shutdown was requested.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves when shutdown is requested.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // An error means every sender is gone, which also ends the daemon.
            let _ = rx.wait_for(|stopped| *stopped).await;
        }
    }

    /// Installs SIGTERM and SIGINT handlers that trigger this handle.
    #[cfg(unix)]
    pub fn listen_for_signals(&self) -> ServerResult<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let handle = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            }
            handle.trigger();
        });
        Ok(())
    }

    /// Installs a Ctrl+C handler that triggers this handle.
    #[cfg(not(unix))]
    pub fn listen_for_signals(&self) -> ServerResult<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down");
                handle.trigger();
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_resolves_after_trigger() {
        let handle = ShutdownHandle::new();
        assert!(!handle.is_triggered());

        let waiter = tokio::spawn(handle.wait());
        handle.clone().trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(handle.is_triggered());
    }

    #[tokio::test]
    async fn wait_after_trigger_is_immediate() {
        let handle = ShutdownHandle::new();
        handle.trigger();
        tokio::time::timeout(Duration::from_millis(100), handle.wait())
            .await
            .unwrap();
    }
}
