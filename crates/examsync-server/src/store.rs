//! File-backed daemon state.
//!
//! Holds everything that must survive between syncs: the last accepted
//! exam payload, guard timestamps, the last sync summary and the resolved
//! calendar ids. The file is read fresh on every access and replaced
//! atomically on every write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use examsync_protocol::SyncSummary;

use crate::error::{SyncError, SyncResult};

/// Persisted daemon state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncState {
    /// Last exam payload accepted by the guard, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_state: Option<String>,

    /// When the guard last accepted a trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trigger_at: Option<DateTime<Utc>>,

    /// When the last sync finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,

    /// Tally of the last sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_summary: Option<SyncSummary>,

    /// Resolved calendar ids, keyed by [`calendar_key`].
    pub calendar_ids: BTreeMap<String, String>,
}

/// Key under which a resolved calendar id is cached.
///
/// A blank calendar name stands for the provider's default calendar.
pub fn calendar_key(provider: &str, calendar_name: Option<&str>) -> String {
    format!("{}::{}", provider, calendar_name.unwrap_or_default().trim())
}

/// JSON file holding a [`SyncState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the state from disk.
    ///
    /// A missing file yields the default state. A corrupt file is logged
    /// and treated as empty, so the next write replaces it.
    pub fn load(&self) -> SyncResult<SyncState> {
        if !self.path.exists() {
            return Ok(SyncState::default());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| SyncError::store(format!("failed to read state file: {}", e)))?;

        match serde_json::from_str(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable state file");
                Ok(SyncState::default())
            }
        }
    }

    /// Writes the state to disk atomically.
    pub fn save(&self, state: &SyncState) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SyncError::store(format!("failed to create state directory: {}", e)))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| SyncError::store(format!("failed to serialize state: {}", e)))?;
        fs::write(&temp_path, content)
            .map_err(|e| SyncError::store(format!("failed to write state file: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| SyncError::store(format!("failed to rename state file: {}", e)))?;

        debug!(path = %self.path.display(), "saved state");
        Ok(())
    }

    /// Loads, mutates and saves the state.
    pub fn update<F>(&self, f: F) -> SyncResult<SyncState>
    where
        F: FnOnce(&mut SyncState),
    {
        let mut state = self.load()?;
        f(&mut state);
        self.save(&state)?;
        Ok(state)
    }

    /// Returns the stored exam payload, if any.
    pub fn exam_state(&self) -> SyncResult<Option<String>> {
        Ok(self.load()?.exam_state)
    }

    /// Stores an accepted exam payload and the time it was accepted.
    pub fn record_trigger(&self, payload: &str, at: DateTime<Utc>) -> SyncResult<()> {
        self.update(|state| {
            state.exam_state = Some(payload.to_string());
            state.last_trigger_at = Some(at);
        })
        .map(drop)
    }

    /// Stores the outcome of a finished sync.
    pub fn record_sync(&self, summary: SyncSummary, at: DateTime<Utc>) -> SyncResult<()> {
        self.update(|state| {
            state.last_summary = Some(summary);
            state.last_sync_at = Some(at);
        })
        .map(drop)
    }

    /// Returns the cached calendar id for a provider and calendar name.
    pub fn calendar_id(&self, provider: &str, calendar_name: Option<&str>) -> SyncResult<Option<String>> {
        let key = calendar_key(provider, calendar_name);
        Ok(self.load()?.calendar_ids.get(&key).cloned())
    }

    /// Caches a resolved calendar id.
    pub fn set_calendar_id(
        &self,
        provider: &str,
        calendar_name: Option<&str>,
        calendar_id: &str,
    ) -> SyncResult<()> {
        let key = calendar_key(provider, calendar_name);
        self.update(|state| {
            state.calendar_ids.insert(key, calendar_id.to_string());
        })
        .map(drop)
    }

    /// Forgets the cached calendar id, e.g. after the calendar was deleted.
    pub fn clear_calendar_id(&self, provider: &str, calendar_name: Option<&str>) -> SyncResult<()> {
        let key = calendar_key(provider, calendar_name);
        self.update(|state| {
            state.calendar_ids.remove(&key);
        })
        .map(drop)
    }
}
