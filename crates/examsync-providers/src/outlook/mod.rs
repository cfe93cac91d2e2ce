//! Outlook adapter over Microsoft Graph.
//!
//! Writes exam events to the account's default calendar, or to a named
//! calendar that is created on first use. Listing requests a single page of
//! up to 100 events with times in UTC.

mod client;
mod config;
mod provider;

pub use client::{OUTLOOK_PAGE_SIZE, OutlookCalendarClient};
pub use config::{GRAPH_API_BASE, OutlookConfig};
pub use provider::OutlookProvider;

/// Provider name used in logs, errors and the state store.
pub const PROVIDER_NAME: &str = "outlook";
