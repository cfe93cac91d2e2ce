//! Sync preferences (`[sync]` table of `config.toml`).
//!
//! Preferences are re-read from disk at the start of every sync so edits
//! take effect without restarting the daemon.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use examsync_core::{DEFAULT_EVENT_NOTES, DEFAULT_SYNC_TAG};

use crate::error::{SyncError, SyncResult};

/// Calendar backend to sync into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Microsoft Graph.
    #[default]
    Outlook,
    /// Google Calendar.
    Google,
}

impl ProviderKind {
    /// Both providers, in status order.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Outlook, ProviderKind::Google];

    /// Returns the provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outlook => "outlook",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outlook" | "microsoft" => Ok(Self::Outlook),
            "google" => Ok(Self::Google),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// User preferences for syncing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Provider used by `exam_changed`, `sync_calendar` and `force_sync`.
    pub preferred_provider: ProviderKind,

    /// Calendar to sync into; blank selects the account's default calendar.
    pub calendar_name: String,

    /// Notes written to created and patched events.
    pub event_notes: String,

    /// Marker identifying machine-managed events.
    pub event_tag: String,

    /// Verbose logging.
    pub debug_mode: bool,

    /// IANA zone in which scraped dates are interpreted; system zone when
    /// unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Minimum time between two accepted `exam_changed` triggers.
    pub min_sync_interval_secs: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            preferred_provider: ProviderKind::default(),
            calendar_name: "Exams".to_string(),
            event_notes: DEFAULT_EVENT_NOTES.to_string(),
            event_tag: DEFAULT_SYNC_TAG.to_string(),
            debug_mode: false,
            timezone: None,
            min_sync_interval_secs: 5,
        }
    }
}

impl Preferences {
    /// Returns the calendar name, or `None` for the default calendar.
    pub fn calendar_name(&self) -> Option<&str> {
        let name = self.calendar_name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Returns the guard interval.
    pub fn min_sync_interval(&self) -> Duration {
        Duration::from_secs(self.min_sync_interval_secs)
    }

    /// Returns the configured observer zone.
    ///
    /// An unknown zone name is logged and ignored.
    pub fn observer_timezone(&self) -> Option<chrono_tz::Tz> {
        let name = self.timezone.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        match name.parse::<chrono_tz::Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                warn!(timezone = %name, "unknown timezone; using the system zone");
                None
            }
        }
    }

    /// Checks values that would make every sync fail.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_tag.trim().is_empty() {
            return Err("sync.event_tag must not be empty".into());
        }
        if let Some(tz) = self.timezone.as_deref()
            && !tz.trim().is_empty()
            && tz.trim().parse::<chrono_tz::Tz>().is_err()
        {
            return Err(format!("sync.timezone is not a known IANA zone: {tz}"));
        }
        Ok(())
    }
}

/// Only the `[sync]` table matters to the daemon; other tables are ignored.
#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    sync: Preferences,
}

/// Reads [`Preferences`] from a TOML file.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
}

impl PreferenceStore {
    /// Creates a store reading the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Creates a store with no file behind it; it always yields defaults.
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    /// Returns the file path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the preferences.
    ///
    /// A missing file yields defaults; a malformed file is an error so a
    /// typo does not silently redirect the sync to another provider.
    pub fn load(&self) -> SyncResult<Preferences> {
        let Some(path) = &self.path else {
            return Ok(Preferences::default());
        };
        if !path.exists() {
            return Ok(Preferences::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::store(format!("failed to read config: {}", e)))?;
        parse_preferences(&content)
    }
}

/// Parses the `[sync]` table of a configuration document.
pub fn parse_preferences(content: &str) -> SyncResult<Preferences> {
    let document: ConfigDocument = toml::from_str(content)
        .map_err(|e| SyncError::store(format!("failed to parse config: {}", e)))?;
    Ok(document.sync)
}
