//! Reconciliation engine.
//!
//! Exams are matched against a calendar's existing events by
//! [`MatchKey`] (`name::durationMinutes`). Planning is pure; applying the
//! plan issues one provider call per create or update, sequentially.
//!
//! Classification per exam:
//!
//! | existing event with same key     | action  |
//! |----------------------------------|---------|
//! | none                             | create  |
//! | managed, location differs        | update  |
//! | managed, same location           | skip    |
//! | not managed (no sync tag)        | skip    |
//!
//! Start times are not compared, and when several events share a key the
//! last one listed wins.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use examsync_core::{CalendarEvent, MatchKey, NormalizedExam};
use examsync_protocol::SyncSummary;
use examsync_providers::CalendarProvider;

/// What to do with one exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Create a new event.
    Create,
    /// Patch the managed event with this id.
    Update {
        /// Provider id of the event to patch.
        event_id: String,
    },
    /// Leave the calendar alone.
    Skip(SkipReason),
}

/// Why an exam was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The matching event already has the exam's location.
    UpToDate,
    /// The matching event does not carry the sync tag.
    Unmanaged,
}

/// An exam paired with its decided action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSync<'a> {
    /// The exam.
    pub exam: &'a NormalizedExam,
    /// Its match key.
    pub key: MatchKey,
    /// The decided action.
    pub action: SyncAction,
}

/// Indexes events by match key; later events replace earlier ones.
///
/// Events without a provider id cannot be patched and are left out.
pub fn index_events(existing: &[CalendarEvent]) -> HashMap<MatchKey, &CalendarEvent> {
    let mut index = HashMap::with_capacity(existing.len());
    for event in existing.iter().filter(|e| e.id.is_some()) {
        index.insert(event.match_key(), event);
    }
    index
}

/// Classifies one exam against the indexed events.
pub fn classify(
    exam: &NormalizedExam,
    index: &HashMap<MatchKey, &CalendarEvent>,
    sync_tag: &str,
) -> SyncAction {
    let Some(existing) = index.get(&MatchKey::for_exam(exam)) else {
        return SyncAction::Create;
    };

    if !existing.is_managed(sync_tag) {
        return SyncAction::Skip(SkipReason::Unmanaged);
    }

    if existing.location.trim() == exam.location.trim() {
        return SyncAction::Skip(SkipReason::UpToDate);
    }

    match &existing.id {
        Some(id) => SyncAction::Update {
            event_id: id.clone(),
        },
        None => SyncAction::Skip(SkipReason::UpToDate),
    }
}

/// Plans the action for every exam.
///
/// The index is built once from the listing; events created while applying
/// the plan are not added to it.
pub fn plan<'a>(
    exams: &'a [NormalizedExam],
    existing: &[CalendarEvent],
    sync_tag: &str,
) -> Vec<PlannedSync<'a>> {
    let index = index_events(existing);
    exams
        .iter()
        .map(|exam| PlannedSync {
            exam,
            key: MatchKey::for_exam(exam),
            action: classify(exam, &index, sync_tag),
        })
        .collect()
}

/// Applies a plan against one calendar.
///
/// `notes` is the full notes body (already carrying the sync tag) written
/// to created and patched events. A rejected call is logged and counted as
/// failed; the remaining exams still run.
pub async fn apply(
    provider: &dyn CalendarProvider,
    token: &str,
    calendar_id: &str,
    planned: &[PlannedSync<'_>],
    notes: &str,
) -> SyncSummary {
    let mut summary = SyncSummary::default();

    for item in planned {
        match &item.action {
            SyncAction::Create => {
                let event = CalendarEvent::from_exam(item.exam, notes);
                match provider.create_event(token, calendar_id, &event).await {
                    Ok(created) => {
                        info!(key = %item.key, id = ?created.id, "created event");
                        summary.created += 1;
                    }
                    Err(e) => {
                        warn!(key = %item.key, error = %e, "create failed");
                        summary.failed += 1;
                    }
                }
            }
            SyncAction::Update { event_id } => {
                let event = CalendarEvent::from_exam(item.exam, notes);
                match provider
                    .update_event(token, calendar_id, event_id, &event)
                    .await
                {
                    Ok(()) => {
                        info!(key = %item.key, id = %event_id, location = %event.location, "updated event");
                        summary.updated += 1;
                    }
                    Err(e) => {
                        warn!(key = %item.key, id = %event_id, error = %e, "update failed");
                        summary.failed += 1;
                    }
                }
            }
            SyncAction::Skip(reason) => {
                debug!(key = %item.key, ?reason, "skipped");
                summary.skipped += 1;
            }
        }
    }

    summary
}
