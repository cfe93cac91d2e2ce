//! examsync daemon: sync engine and IPC server.
//!
//! The daemon owns one [`SyncContext`] for its whole lifetime. Requests
//! arrive over a Unix socket ([`SocketServer`]) and are dispatched by a
//! [`RequestHandler`]:
//!
//! ```text
//! exam_changed ─► guard ─► normalize ─► resolve calendar ─► list ─► plan ─► apply
//!                  │                                                         │
//!                  └──────────────── StateStore (state.json) ◄───────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use examsync_server::{
//!     PreferenceStore, RequestHandler, ServerConfig, ShutdownHandle, SocketServer, StateStore,
//!     SyncContext, default_state_path, make_connection_handler,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = SyncContext::new(PreferenceStore::in_memory(), StateStore::new(default_state_path()));
//!     let shutdown = ShutdownHandle::new();
//!     let server = SocketServer::bind(ServerConfig::default()).await?;
//!     let handler = RequestHandler::new(Arc::new(context), shutdown.clone());
//!     server.serve(make_connection_handler(handler), shutdown.wait()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod error;
mod guard;
mod handler;
mod prefs;
mod reconcile;
mod signals;
mod socket;
mod store;
mod sweep;
#[cfg(test)]
mod testing;

pub use config::{ServerConfig, default_socket_path, default_state_path};
pub use context::{SyncContext, TriggerOutcome};
pub use error::{ServerError, ServerResult, SyncError, SyncResult};
pub use guard::{GuardDecision, evaluate as evaluate_trigger};
pub use handler::{RequestHandler, make_connection_handler};
pub use prefs::{PreferenceStore, Preferences, ProviderKind, parse_preferences};
pub use reconcile::{PlannedSync, SkipReason, SyncAction, apply, classify, index_events, plan};
pub use signals::ShutdownHandle;
pub use socket::{Connection, SocketServer};
pub use store::{StateStore, SyncState, calendar_key};
pub use sweep::delete_synced;
