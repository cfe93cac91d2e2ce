//! Provider-neutral calendar event types.
//!
//! - [`CalendarEvent`]: the event shape the reconciliation engine works with
//! - [`MatchKey`]: the `name::durationMinutes` identity used to correlate
//!   exams with existing events
//! - [`compose_notes`]: builds the notes text carrying the sync tag

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exam::NormalizedExam;
use crate::time::minutes_between;

/// Marker embedded in the notes of every machine-created event.
pub const DEFAULT_SYNC_TAG: &str = "Synced Automatically";

/// Notes text written to created events when none is configured.
pub const DEFAULT_EVENT_NOTES: &str = "Synced Automatically";

/// A calendar event, independent of the provider it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Provider identifier; `None` for events not created yet.
    pub id: Option<String>,
    /// Event title.
    pub title: String,
    /// Start time.
    pub start: DateTime<Utc>,
    /// End time.
    pub end: DateTime<Utc>,
    /// Location display name.
    pub location: String,
    /// Notes / description body.
    pub notes: String,
}

impl CalendarEvent {
    /// Builds the event to write for an exam.
    pub fn from_exam(exam: &NormalizedExam, notes: impl Into<String>) -> Self {
        Self {
            id: None,
            title: exam.name.clone(),
            start: exam.start,
            end: exam.end,
            location: exam.location.clone(),
            notes: notes.into(),
        }
    }

    /// Builder method to set the provider id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the event length in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        minutes_between(self.start, self.end)
    }

    /// Returns the key used to match this event against exams.
    pub fn match_key(&self) -> MatchKey {
        MatchKey::new(&self.title, self.duration_minutes())
    }

    /// Returns true if the notes carry the sync tag.
    ///
    /// Only managed events may be updated or deleted.
    pub fn is_managed(&self, sync_tag: &str) -> bool {
        !sync_tag.is_empty() && self.notes.contains(sync_tag)
    }
}

/// Identity correlating an exam with an existing event: `name::minutes`.
///
/// The start date is not part of the key, so two offerings of the same
/// exam with the same length are indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchKey(String);

impl MatchKey {
    /// Creates a key from a name and a duration in minutes.
    pub fn new(name: &str, duration_minutes: i64) -> Self {
        Self(format!("{name}::{duration_minutes}"))
    }

    /// Returns the key for an exam.
    pub fn for_exam(exam: &NormalizedExam) -> Self {
        Self::new(&exam.name, exam.duration_minutes())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the notes body for a managed event.
///
/// The tag is appended on its own line unless the notes already contain it.
pub fn compose_notes(notes: &str, sync_tag: &str) -> String {
    let notes = notes.trim();
    if sync_tag.is_empty() || notes.contains(sync_tag) {
        notes.to_string()
    } else if notes.is_empty() {
        sync_tag.to_string()
    } else {
        format!("{notes}\n{sync_tag}")
    }
}
