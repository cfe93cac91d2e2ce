//! Daemon actions: send one request, print the answer.

use std::fmt::Write as _;

use examsync_protocol::{
    DeletedEvent, Request, Response, StatusInfo, SyncReport, SyncSummary, UnchangedReason,
};

use crate::error::{ClientError, ClientResult};
use crate::socket::SocketClient;

/// Sends `request` and prints the response, as text or JSON.
pub async fn run(client: &SocketClient, request: Request, json: bool) -> ClientResult<()> {
    let response = client.send(request).await?;
    if json {
        let text = serde_json::to_string_pretty(&response)
            .map_err(|e| ClientError::Protocol(e.into()))?;
        println!("{}", text);
    } else {
        println!("{}", render(&response));
    }
    Ok(())
}

/// Renders a response for the terminal.
pub fn render(response: &Response) -> String {
    match response {
        Response::Sync { report } => render_report(report),
        Response::Unchanged { reason } => match reason {
            UnchangedReason::Identical => "Unchanged: exam list is identical to the last one".into(),
            UnchangedReason::Throttled => "Unchanged: too soon after the previous sync".into(),
        },
        Response::Deleted { events } => render_deleted(events),
        Response::TokensRefreshed { providers } if providers.is_empty() => {
            "No token had a refresh token to use".into()
        }
        Response::TokensRefreshed { providers } => format!("Refreshed: {}", providers.join(", ")),
        Response::Status { info } => render_status(info),
        Response::Pong => "Daemon is running".into(),
        Response::Ok => "OK".into(),
        Response::Error { error } => format!("Error: {}", error.message),
    }
}

fn render_summary(summary: &SyncSummary) -> String {
    let mut text = format!(
        "{} created, {} updated, {} skipped",
        summary.created, summary.updated, summary.skipped
    );
    if summary.failed > 0 {
        let _ = write!(text, ", {} failed", summary.failed);
    }
    if summary.unparsed > 0 {
        let _ = write!(text, ", {} unparsed", summary.unparsed);
    }
    text
}

fn render_report(report: &SyncReport) -> String {
    format!(
        "Synced to {} ({}): {}",
        report.provider,
        report.calendar_id,
        render_summary(&report.summary)
    )
}

fn render_deleted(events: &[DeletedEvent]) -> String {
    if events.is_empty() {
        return "No synced events found".into();
    }
    let mut text = format!("Deleted {} event(s):", events.len());
    for event in events {
        let _ = write!(text, "\n  {} ({})", event.event_name, event.calendar_name);
    }
    text
}

fn render_status(info: &StatusInfo) -> String {
    let mut text = format!(
        "Uptime: {}s\nProvider: {}\nCalendar: {}\nExam list stored: {}",
        info.uptime_seconds,
        info.preferred_provider,
        info.calendar_name.as_deref().unwrap_or("(default)"),
        if info.has_exam_state { "yes" } else { "no" },
    );
    match (&info.last_sync, &info.last_summary) {
        (Some(at), Some(summary)) => {
            let _ = write!(text, "\nLast sync: {} ({})", at.to_rfc3339(), render_summary(summary));
        }
        (Some(at), None) => {
            let _ = write!(text, "\nLast sync: {}", at.to_rfc3339());
        }
        _ => text.push_str("\nLast sync: never"),
    }
    for provider in &info.providers {
        let token = match (provider.has_token, provider.can_refresh) {
            (true, true) => "token, refreshable",
            (true, false) => "token",
            (false, _) => "no token",
        };
        let _ = write!(text, "\n  {}: {}", provider.name, token);
        if let Some(id) = &provider.calendar_id {
            let _ = write!(text, ", calendar {}", id);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use examsync_protocol::ProviderStatus;

    #[test]
    fn renders_sync_report() {
        let response = Response::sync(SyncReport {
            provider: "outlook".into(),
            calendar_id: "cal-1".into(),
            summary: SyncSummary {
                created: 2,
                updated: 1,
                skipped: 3,
                failed: 1,
                unparsed: 0,
            },
        });
        assert_eq!(
            render(&response),
            "Synced to outlook (cal-1): 2 created, 1 updated, 3 skipped, 1 failed"
        );
    }

    #[test]
    fn renders_unchanged_and_deleted() {
        assert!(render(&Response::unchanged(UnchangedReason::Throttled)).contains("too soon"));
        assert_eq!(render(&Response::deleted(Vec::new())), "No synced events found");

        let text = render(&Response::deleted(vec![DeletedEvent {
            event_name: "CS 225: Final".into(),
            calendar_name: "Exams".into(),
        }]));
        assert_eq!(text, "Deleted 1 event(s):\n  CS 225: Final (Exams)");
    }

    #[test]
    fn renders_status() {
        let info = StatusInfo::new(42, "google")
            .with_calendar_name("Exams")
            .with_last_sync(
                Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
                Some(SyncSummary::default()),
            )
            .with_provider(ProviderStatus {
                name: "google".into(),
                has_token: true,
                can_refresh: true,
                expires_at: None,
                calendar_id: Some("primary".into()),
            });

        let text = render(&Response::status(info));
        assert!(text.contains("Provider: google"));
        assert!(text.contains("Last sync: 2025-03-01T12:00:00+00:00 (0 created, 0 updated, 0 skipped)"));
        assert!(text.contains("google: token, refreshable, calendar primary"));
    }
}
