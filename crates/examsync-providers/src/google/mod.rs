//! Google Calendar adapter.
//!
//! Writes exam events to the primary calendar, or to a named secondary
//! calendar that is created on first use. Listing requests a single page
//! of up to 2500 events.

mod client;
mod config;
mod provider;

pub use client::{GOOGLE_PAGE_SIZE, GoogleCalendarClient};
pub use config::{GOOGLE_API_BASE, GoogleConfig, OAuthCredentials};
pub use provider::{GoogleProvider, PRIMARY_CALENDAR};

/// Provider name used in logs, errors and the state store.
pub const PROVIDER_NAME: &str = "google";
