//! Deletion sweep: removes every managed event from every calendar.

use tracing::{info, warn};

use examsync_protocol::DeletedEvent;
use examsync_providers::{CalendarProvider, ProviderResult};

/// Deletes the events whose notes carry `sync_tag`, across all calendars.
///
/// Only successful deletions are reported. A calendar whose events cannot
/// be listed is logged and skipped; failing to list the calendars
/// themselves aborts the sweep.
pub async fn delete_synced(
    provider: &dyn CalendarProvider,
    token: &str,
    sync_tag: &str,
) -> ProviderResult<Vec<DeletedEvent>> {
    let calendars = provider.list_calendars(token).await?;
    let mut deleted = Vec::new();

    for calendar in &calendars {
        let events = match provider.list_events(token, &calendar.id).await {
            Ok(events) => events,
            Err(e) => {
                warn!(calendar = %calendar.name, error = %e, "cannot list calendar; skipping");
                continue;
            }
        };

        for event in events.iter().filter(|e| e.is_managed(sync_tag)) {
            let Some(event_id) = event.id.as_deref() else {
                continue;
            };
            match provider.delete_event(token, &calendar.id, event_id).await {
                Ok(()) => {
                    info!(title = %event.title, calendar = %calendar.name, "deleted event");
                    deleted.push(DeletedEvent {
                        event_name: event.title.clone(),
                        calendar_name: calendar.name.clone(),
                    });
                }
                Err(e) => {
                    warn!(title = %event.title, calendar = %calendar.name, error = %e, "delete failed");
                }
            }
        }
    }

    info!(provider = %provider.name(), count = deleted.len(), "deletion sweep finished");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProvider;
    use chrono::{TimeZone, Utc};
    use examsync_core::CalendarEvent;
    use examsync_providers::CalendarInfo;

    const TAG: &str = "Synced Automatically";

    fn event(id: &str, title: &str, notes: &str) -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2025, 4, 1, 14, 0, 0).unwrap();
        CalendarEvent {
            id: Some(id.into()),
            title: title.into(),
            start,
            end: start + chrono::Duration::hours(1),
            location: String::new(),
            notes: notes.into(),
        }
    }

    #[tokio::test]
    async fn deletes_only_tagged_events_across_calendars() {
        let provider = FakeProvider::new()
            .with_calendar(
                CalendarInfo::new("c1", "Calendar"),
                vec![
                    event("a", "Dentist", "bring card"),
                    event("b", "CS 225: Final", "Note\nSynced Automatically"),
                ],
            )
            .with_calendar(
                CalendarInfo::new("c2", "Exams"),
                vec![event("c", "MATH 241: Quiz", TAG)],
            );

        let deleted = delete_synced(&provider, "tok", TAG).await.unwrap();

        assert_eq!(
            deleted,
            vec![
                DeletedEvent {
                    event_name: "CS 225: Final".into(),
                    calendar_name: "Calendar".into(),
                },
                DeletedEvent {
                    event_name: "MATH 241: Quiz".into(),
                    calendar_name: "Exams".into(),
                },
            ]
        );
        assert_eq!(provider.writes(), vec!["delete c1 b", "delete c2 c"]);
        assert_eq!(provider.events("c1").len(), 1);
    }

    #[tokio::test]
    async fn same_named_untagged_event_survives() {
        let provider = FakeProvider::new().with_calendar(
            CalendarInfo::new("c1", "Exams"),
            vec![
                event("tagged", "Quiz 1", "Synced Automatically"),
                event("mine", "Quiz 1", "my notes"),
            ],
        );

        let deleted = delete_synced(&provider, "tok", TAG).await.unwrap();

        assert_eq!(deleted.len(), 1);
        assert_eq!(provider.writes(), vec!["delete c1 tagged"]);
        let remaining = provider.events("c1");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id.as_deref(), Some("mine"));
    }

    #[tokio::test]
    async fn failed_delete_is_not_reported() {
        let provider = FakeProvider::new()
            .with_calendar(
                CalendarInfo::new("c1", "Exams"),
                vec![event("gone", "Quiz 1", TAG), event("ok", "Quiz 2", TAG)],
            )
            .failing_delete("gone");

        let deleted = delete_synced(&provider, "tok", TAG).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].event_name, "Quiz 2");
    }

    #[tokio::test]
    async fn no_calendars_means_nothing_deleted() {
        let provider = FakeProvider::new();
        assert!(delete_synced(&provider, "tok", TAG).await.unwrap().is_empty());
    }
}
