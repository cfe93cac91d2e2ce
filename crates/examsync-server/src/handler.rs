//! Request dispatch.
//!
//! Routes each decoded [`Request`] to the [`SyncContext`] and turns the
//! outcome into a [`Response`]. Engine failures become error responses; the
//! connection stays open.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{Span, debug, info, warn};

use examsync_protocol::{ErrorResponse, Request, Response};

use crate::context::{SyncContext, TriggerOutcome};
use crate::error::{ServerError, ServerResult, SyncError};
use crate::signals::ShutdownHandle;
use crate::socket::Connection;

/// Handles requests against a shared [`SyncContext`].
#[derive(Clone)]
pub struct RequestHandler {
    context: Arc<SyncContext>,
    shutdown: ShutdownHandle,
}

impl RequestHandler {
    /// Creates a handler.
    pub fn new(context: Arc<SyncContext>, shutdown: ShutdownHandle) -> Self {
        Self { context, shutdown }
    }

    /// Handles a single request.
    #[tracing::instrument(skip_all, fields(request = request.kind(), duration_ms))]
    pub async fn handle(&self, request: &Request) -> Response {
        let start = std::time::Instant::now();

        let response = match request {
            Request::Ping => Response::Pong,
            Request::Status => respond(self.context.status(), Response::status),
            Request::ExamChanged { exam_data } => {
                debug!(bytes = exam_data.len(), "exam list received");
                respond(
                    self.context.exam_changed(exam_data).await,
                    |outcome| match outcome {
                        TriggerOutcome::Synced(report) => Response::sync(report),
                        TriggerOutcome::Unchanged(reason) => Response::unchanged(reason),
                    },
                )
            }
            Request::SyncCalendar { exam_data } => {
                respond(self.context.sync_calendar(exam_data).await, Response::sync)
            }
            Request::ForceSync => respond(self.context.force_sync().await, Response::sync),
            Request::DeleteSynced => {
                respond(self.context.delete_synced().await, Response::deleted)
            }
            Request::RefreshTokens => respond(self.context.refresh_tokens().await, |providers| {
                Response::TokensRefreshed { providers }
            }),
            Request::Shutdown => {
                info!("Shutdown requested by client");
                self.shutdown.trigger();
                Response::Ok
            }
        };

        let elapsed = start.elapsed().as_millis();
        Span::current().record("duration_ms", elapsed);
        debug!(duration_ms = elapsed, success = response.is_success(), "Request handled");

        response
    }

    /// Serves one connection until the client disconnects or shutdown is
    /// requested.
    pub async fn handle_connection(&self, mut conn: Connection) -> ServerResult<()> {
        while let Some(envelope) = conn.read_request().await? {
            let response = self.handle(&envelope.payload).await;
            conn.respond(&envelope.request_id, response).await?;

            if self.shutdown.is_triggered() {
                return Err(ServerError::Shutdown);
            }
        }
        debug!("Client disconnected");
        Ok(())
    }
}

fn respond<T>(result: Result<T, SyncError>, ok: impl FnOnce(T) -> Response) -> Response {
    match result {
        Ok(value) => ok(value),
        Err(e) => {
            warn!(error = %e, code = ?e.code(), "request failed");
            Response::from_error(ErrorResponse::from(e))
        }
    }
}

/// Builds the per-connection callback for [`crate::SocketServer::serve`].
pub fn make_connection_handler(
    handler: RequestHandler,
) -> impl Fn(Connection) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
    move |conn| {
        let handler = handler.clone();
        Box::pin(async move {
            if let Err(e) = handler.handle_connection(conn).await
                && !matches!(e, ServerError::Shutdown)
            {
                warn!(error = %e, "Connection handler error");
            }
        })
    }
}
