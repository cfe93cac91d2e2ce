//! Microsoft Graph calendar client.
//!
//! Field mapping to the neutral event: `subject` is the title,
//! `location.displayName` the location, `body.content` the notes (written
//! as HTML). Listing requests UTC times through the `Prefer` header, so the
//! naive `dateTime` strings Graph returns are read as UTC.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use examsync_core::{CalendarEvent, parse_timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::provider::CalendarInfo;

use super::PROVIDER_NAME;

/// Number of events requested per listing.
pub const OUTLOOK_PAGE_SIZE: usize = 100;

const OUTLOOK_TIMEZONE_HEADER: &str = r#"outlook.timezone="UTC""#;

/// Microsoft Graph calendar client.
#[derive(Debug, Clone)]
pub struct OutlookCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OutlookCalendarClient {
    /// Creates a client against the given Graph base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/me/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    /// Returns the id of the account's default calendar.
    pub async fn default_calendar(&self, token: &str) -> ProviderResult<String> {
        let url = format!("{}/me/calendar", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        let response = http::check_status(response, PROVIDER_NAME).await?;
        let calendar: ApiCalendar = http::read_json(response, PROVIDER_NAME).await?;
        Ok(calendar.id)
    }

    /// Lists the account's calendars (first page).
    pub async fn list_calendars(&self, token: &str) -> ProviderResult<Vec<CalendarInfo>> {
        let url = format!("{}/me/calendars", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        let response = http::check_status(response, PROVIDER_NAME).await?;
        let list: ODataList<ApiCalendar> = http::read_json(response, PROVIDER_NAME).await?;

        if list.next_link.is_some() {
            warn!("calendar list has more pages; only the first page is used");
        }

        Ok(list
            .value
            .into_iter()
            .map(|c| CalendarInfo::new(c.id, c.name).with_default(c.is_default_calendar))
            .collect())
    }

    /// Creates a calendar.
    pub async fn create_calendar(&self, token: &str, name: &str) -> ProviderResult<CalendarInfo> {
        let url = format!("{}/me/calendars", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        let response = http::check_status(response, PROVIDER_NAME).await?;
        let created: ApiCalendar = http::read_json(response, PROVIDER_NAME).await?;
        Ok(CalendarInfo::new(created.id, created.name))
    }

    /// Fetches the first page of a calendar's events.
    ///
    /// `@odata.nextLink` is logged but not followed.
    pub async fn list_events(
        &self,
        token: &str,
        calendar_id: &str,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let response = self
            .http_client
            .get(self.events_url(calendar_id))
            .bearer_auth(token)
            .header("Prefer", OUTLOOK_TIMEZONE_HEADER)
            .query(&[("$top", OUTLOOK_PAGE_SIZE.to_string())])
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        let response = http::check_status(response, PROVIDER_NAME).await?;
        let list: ODataList<ApiEvent> = http::read_json(response, PROVIDER_NAME).await?;

        if list.next_link.is_some() {
            warn!(
                calendar_id,
                "more than {} events; only the first page is reconciled", OUTLOOK_PAGE_SIZE
            );
        }

        let events: Vec<CalendarEvent> = list.value.into_iter().filter_map(convert_event).collect();
        debug!("fetched {} events from calendar {}", events.len(), calendar_id);
        Ok(events)
    }

    /// Creates an event and returns its id.
    pub async fn create_event(
        &self,
        token: &str,
        calendar_id: &str,
        event: &ApiEventPayload<'_>,
    ) -> ProviderResult<String> {
        let response = self
            .http_client
            .post(self.events_url(calendar_id))
            .bearer_auth(token)
            .json(event)
            .send()
            .await
            .map_err(|e| http::request_error(e, PROVIDER_NAME))?;
        let response = http::check_status(response, PROVIDER_NAME).await?;
        let created: CreatedEvent = http::read_json(response, PROVIDER_NAME).await?;
        created.id.ok_or_else(|| {
            ProviderError::invalid_response("created event has no id").with_provider(PROVIDER_NAME)
        })
    }

    /// Patches an event with the full payload.
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

/// Converts a Graph event, skipping cancelled and all-day events.
fn convert_event(event: ApiEvent) -> Option<CalendarEvent> {
    if event.is_cancelled || event.is_all_day {
        return None;
    }

    let Some(start) = event.start.as_ref().and_then(ApiDateTime::to_utc) else {
        debug!(event_id = %event.id, "skipping event without a start");
        return None;
    };
    let Some(end) = event.end.as_ref().and_then(ApiDateTime::to_utc) else {
        debug!(event_id = %event.id, "skipping event without an end");
        return None;
    };

    Some(CalendarEvent {
        id: Some(event.id),
        title: event.subject.unwrap_or_default(),
        start,
        end,
        location: event.location.and_then(|l| l.display_name).unwrap_or_default(),
        notes: event.body.and_then(|b| b.content).unwrap_or_default(),
    })
}

/// Request body for event create/patch.
#[derive(Debug, Serialize)]
pub struct ApiEventPayload<'a> {
    subject: &'a str,
    start: ApiDateTimePayload,
    end: ApiDateTimePayload,
    location: ApiLocationPayload<'a>,
    body: ApiBodyPayload<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiDateTimePayload {
    date_time: String,
    time_zone: &'static str,
}

impl ApiDateTimePayload {
    fn utc(at: DateTime<Utc>) -> Self {
        Self {
            date_time: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            time_zone: "UTC",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiLocationPayload<'a> {
    display_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiBodyPayload<'a> {
    content_type: &'static str,
    content: &'a str,
}

impl<'a> ApiEventPayload<'a> {
    /// Builds the payload for a neutral event.
    pub fn from_event(event: &'a CalendarEvent) -> Self {
        Self {
            subject: &event.title,
            start: ApiDateTimePayload::utc(event.start),
            end: ApiDateTimePayload::utc(event.end),
            location: ApiLocationPayload {
                display_name: &event.location,
            },
            body: ApiBodyPayload {
                content_type: "HTML",
                content: &event.notes,
            },
        }
    }
}

/// An OData collection page.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ODataList<T> {
    #[serde(default)]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCalendar {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_default_calendar: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: Option<String>,
}

/// A single event from Microsoft Graph.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: String,
    subject: Option<String>,
    start: Option<ApiDateTime>,
    end: Option<ApiDateTime>,
    location: Option<ApiLocation>,
    body: Option<ApiBody>,
    #[serde(default)]
    is_all_day: bool,
    #[serde(default)]
    is_cancelled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDateTime {
    date_time: String,
    #[serde(default)]
    time_zone: Option<String>,
}

impl ApiDateTime {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        if let Some(zone) = self.time_zone.as_deref()
            && !zone.eq_ignore_ascii_case("UTC")
        {
            debug!(zone, "event time not in UTC; reading it as UTC");
        }
        parse_timestamp(&self.date_time)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiLocation {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiBody {
    content: Option<String>,
}
