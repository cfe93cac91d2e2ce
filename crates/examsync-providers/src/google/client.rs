//! Google Calendar API client.
//!
//! Low-level HTTP calls and wire types. Field mapping to the neutral event:
//! `summary` is the title, `location` a plain string, `description` the
//! notes.

use std::time::Duration;

use chrono::SecondsFormat;
use examsync_core::{CalendarEvent, parse_timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::provider::CalendarInfo;

use super::PROVIDER_NAME;

/// Number of events requested per listing.
pub const GOOGLE_PAGE_SIZE: usize = 2500;

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Creates a client against the given API base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    fn calendar_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/events/{}",
            self.calendar_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    /// Lists the calendars in the user's calendar list.
    pub async fn list_calendars(&self, token: &str) -> ProviderResult<Vec<CalendarInfo>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        let response = http::check_status(response, PROVIDER_NAME).await?;
        let list: CalendarListResponse = http::read_json(response, PROVIDER_NAME).await?;

        if list.next_page_token.is_some() {
            warn!("calendar list has more pages; only the first page is used");
        }

        Ok(list
            .items
            .into_iter()
            .map(|c| CalendarInfo::new(c.id, c.summary).with_default(c.primary))
            .collect())
    }

    /// Creates a secondary calendar.
    pub async fn create_calendar(&self, token: &str, name: &str) -> ProviderResult<CalendarInfo> {
        let url = format!("{}/calendars", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "summary": name }))
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        let response = http::check_status(response, PROVIDER_NAME).await?;
        let created: ApiCalendar = http::read_json(response, PROVIDER_NAME).await?;
        Ok(CalendarInfo::new(created.id, created.summary))
    }

    /// Fetches the first page of a calendar's events.
    ///
    /// `nextPageToken` is logged but not followed.
    pub async fn list_events(
        &self,
        token: &str,
        calendar_id: &str,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let url = format!("{}/events", self.calendar_url(calendar_id));
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[("maxResults", GOOGLE_PAGE_SIZE.to_string())])
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        let response = http::check_status(response, PROVIDER_NAME).await?;
        let list: EventListResponse = http::read_json(response, PROVIDER_NAME).await?;

        if list.next_page_token.is_some() {
            warn!(
                calendar_id,
                "more than {} events; only the first page is reconciled", GOOGLE_PAGE_SIZE
            );
        }

        let events: Vec<CalendarEvent> = list.items.into_iter().filter_map(convert_event).collect();
        debug!("fetched {} events from calendar {}", events.len(), calendar_id);
        Ok(events)
    }

    /// Creates an event and returns its id.
    pub async fn insert_event(
        &self,
        token: &str,
        calendar_id: &str,
        event: &ApiEventPayload<'_>,
    ) -> ProviderResult<String> {
        let url = format!("{}/events", self.calendar_url(calendar_id));
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(event)
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        let response = http::check_status(response, PROVIDER_NAME).await?;
        let created: ApiEvent = http::read_json(response, PROVIDER_NAME).await?;
        created.id.ok_or_else(|| {
            ProviderError::invalid_response("created event has no id").with_provider(PROVIDER_NAME)
        })
    }

    /// Patches an event.
    pub async fn patch_event(
        &self,
        token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &ApiEventPayload<'_>,
    ) -> ProviderResult<()> {
        let response = self
            .http_client
            .patch(self.event_url(calendar_id, event_id))
            .bearer_auth(token)
            .json(event)
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        http::check_status(response, PROVIDER_NAME).await?;
        Ok(())
    }

    /// Deletes an event.
    pub async fn delete_event(
        &self,
        token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> ProviderResult<()> {
        let response = self
            .http_client
            .delete(self.event_url(calendar_id, event_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        http::check_status(response, PROVIDER_NAME).await?;
        Ok(())
    }
}

/// Converts an API event, skipping cancelled, all-day and id-less events.
fn convert_event(event: ApiEvent) -> Option<CalendarEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id?;
    let Some(start) = event.start.date_time.as_deref().and_then(parse_timestamp) else {
        debug!(event_id = %id, "skipping event without a timed start");
        return None;
    };
    let Some(end) = event.end.date_time.as_deref().and_then(parse_timestamp) else {
        debug!(event_id = %id, "skipping event without a timed end");
        return None;
    };

    Some(CalendarEvent {
        id: Some(id),
        title: event.summary.unwrap_or_default(),
        start,
        end,
        location: event.location.unwrap_or_default(),
        notes: event.description.unwrap_or_default(),
    })
}

/// Request body for event insert/patch.
#[derive(Debug, Serialize)]
pub struct ApiEventPayload<'a> {
    summary: &'a str,
    start: ApiEventTimePayload<'a>,
    end: ApiEventTimePayload<'a>,
    location: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTimePayload<'a> {
    date_time: String,
    time_zone: &'a str,
}

impl<'a> ApiEventPayload<'a> {
    /// Builds the payload for a neutral event.
    pub fn from_event(event: &'a CalendarEvent, time_zone: &'a str) -> Self {
        Self {
            summary: &event.title,
            start: ApiEventTimePayload {
                date_time: event.start.to_rfc3339_opts(SecondsFormat::Millis, true),
                time_zone,
            },
            end: ApiEventTimePayload {
                date_time: event.end.to_rfc3339_opts(SecondsFormat::Millis, true),
                time_zone,
            },
            location: &event.location,
            description: &event.notes,
        }
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    status: Option<String>,
}

/// Event time from the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date_time: Option<String>,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<ApiCalendar>,
    next_page_token: Option<String>,
}

/// A calendar from the calendar list.
#[derive(Debug, Deserialize)]
struct ApiCalendar {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    primary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parse_event_list() {
        let json = r#"{
            "items": [
                {"id": "e1", "summary": "CS 225: Midterm 1",
                 "start": {"dateTime": "2025-03-26T20:00:00-05:00"},
                 "end": {"dateTime": "2025-03-26T21:30:00-05:00"},
                 "location": "Room A", "description": "Synced Automatically",
                 "status": "confirmed"},
                {"id": "e2", "summary": "Holiday",
                 "start": {"date": "2025-03-27"}, "end": {"date": "2025-03-28"}},
                {"id": "e3", "status": "cancelled",
                 "start": {"dateTime": "2025-03-26T20:00:00Z"},
                 "end": {"dateTime": "2025-03-26T21:00:00Z"}}
            ],
            "nextPageToken": "abc"
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.next_page_token.as_deref(), Some("abc"));

        let events: Vec<_> = response.items.into_iter().filter_map(convert_event).collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("e1"));
        assert_eq!(events[0].start, Utc.with_ymd_and_hms(2025, 3, 27, 1, 0, 0).unwrap());
        assert_eq!(events[0].duration_minutes(), 90);
        assert_eq!(events[0].match_key().as_str(), "CS 225: Midterm 1::90");
    }

    #[test]
    fn payload_shape() {
        let start = Utc.with_ymd_and_hms(2025, 3, 27, 1, 0, 0).unwrap();
        let event = CalendarEvent {
            id: None,
            title: "Quiz".into(),
            start,
            end: start + chrono::Duration::minutes(50),
            location: "Room B".into(),
            notes: "Synced Automatically".into(),
        };

        let json = serde_json::to_value(ApiEventPayload::from_event(&event, "America/Chicago")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "summary": "Quiz",
                "start": {"dateTime": "2025-03-27T01:00:00.000Z", "timeZone": "America/Chicago"},
                "end": {"dateTime": "2025-03-27T01:50:00.000Z", "timeZone": "America/Chicago"},
                "location": "Room B",
                "description": "Synced Automatically"
            })
        );
    }
}
