//! CalendarProvider trait and the Outlook / Google adapters.
//!
//! This crate is the boundary between the sync engine and the calendar
//! APIs:
//!
//! - [`CalendarProvider`] - The trait both adapters implement
//! - [`TokenStorage`] / [`TokenInfo`] - Per-provider token files
//! - [`TokenRefresher`] - The OAuth `refresh_token` grant
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐
//! │ Microsoft Graph  │    │ Google Calendar  │
//! └────────┬─────────┘    └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//! ┌──────────────────┐    ┌──────────────────┐
//! │ OutlookProvider  │    │  GoogleProvider  │
//! └────────┬─────────┘    └────────┬─────────┘
//!          │                       │
//!          │   CalendarProvider    │
//!          └───────────┬───────────┘
//!                      │
//!                      ▼
//!              ┌───────────────┐
//!              │ CalendarEvent │
//!              └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use examsync_providers::CalendarProvider;
//!
//! async fn list(provider: &dyn CalendarProvider) -> ProviderResult<Vec<CalendarEvent>> {
//!     let token = provider.token_storage().access_token()?;
//!     let calendar = provider.resolve_calendar(&token, Some("Exams")).await?;
//!     provider.list_events(&token, &calendar).await
//! }
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
mod http;
pub mod oauth;
#[cfg(feature = "outlook")]
pub mod outlook;
pub mod provider;
pub mod tokens;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use oauth::{OAuthEndpoint, TokenRefresher};
pub use provider::{BoxFuture, CalendarInfo, CalendarProvider};
pub use tokens::{TokenInfo, TokenStorage, parse_token};
