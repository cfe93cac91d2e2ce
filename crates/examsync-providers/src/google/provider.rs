//! [`CalendarProvider`] implementation for Google Calendar.

use examsync_core::CalendarEvent;
use tracing::warn;

use crate::error::{ProviderError, ProviderResult};
use crate::oauth::TokenRefresher;
use crate::provider::{BoxFuture, CalendarInfo, CalendarProvider};
use crate::tokens::{TokenInfo, TokenStorage};

use super::PROVIDER_NAME;
use super::client::{ApiEventPayload, GOOGLE_PAGE_SIZE, GoogleCalendarClient};
use super::config::GoogleConfig;

/// Google's alias for the signed-in user's main calendar.
pub const PRIMARY_CALENDAR: &str = "primary";

/// Google Calendar provider.
pub struct GoogleProvider {
    config: GoogleConfig,
    client: GoogleCalendarClient,
    refresher: TokenRefresher,
    token_storage: TokenStorage,
}

impl GoogleProvider {
    /// Creates a provider from its configuration.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        if let Some(credentials) = &config.credentials {
            credentials
                .validate()
                .map_err(|e| ProviderError::configuration(e).with_provider(PROVIDER_NAME))?;
        }

        Ok(Self {
            client: GoogleCalendarClient::new(&config.base_url, config.timeout)?,
            refresher: TokenRefresher::new(PROVIDER_NAME, config.timeout)?,
            token_storage: TokenStorage::new(&config.token_path),
            config,
        })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn page_cap(&self) -> usize {
        GOOGLE_PAGE_SIZE
    }

    fn token_storage(&self) -> &TokenStorage {
        &self.token_storage
    }

    fn default_calendar<'a>(&'a self, _token: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async { Ok(PRIMARY_CALENDAR.to_string()) })
    }

    fn list_calendars<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarInfo>>> {
        Box::pin(self.client.list_calendars(token))
    }

    fn create_calendar<'a>(
        &'a self,
        token: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        Box::pin(self.client.create_calendar(token, name))
    }

    fn list_events<'a>(
        &'a self,
        token: &'a str,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(self.client.list_events(token, calendar_id))
    }

    fn create_event<'a>(
        &'a self,
        token: &'a str,
        calendar_id: &'a str,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        Box::pin(async move {
            let payload = ApiEventPayload::from_event(event, &self.config.time_zone);
            match self.client.insert_event(token, calendar_id, &payload).await {
                Ok(id) => Ok(event.clone().with_id(id)),
                Err(e) => {
                    warn!(title = %event.title, error = %e, "failed to create Google event");
                    Err(e)
                }
            }
        })
    }

    fn update_event<'a>(
        &'a self,
        token: &'a str,
        calendar_id: &'a str,
        event_id: &'a str,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let payload = ApiEventPayload::from_event(event, &self.config.time_zone);
            let result = self
                .client
                .patch_event(token, calendar_id, event_id, &payload)
                .await;
            if let Err(e) = &result {
                warn!(title = %event.title, error = %e, "failed to update Google event");
            }
            result
        })
    }

    fn delete_event<'a>(
        &'a self,
        token: &'a str,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.client.delete_event(token, calendar_id, event_id))
    }

    fn refresh_tokens<'a>(
        &'a self,
        current: &'a TokenInfo,
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(async move {
            let endpoint = self.config.oauth_endpoint().ok_or_else(|| {
                ProviderError::configuration("google.client_id is not configured")
                    .with_provider(PROVIDER_NAME)
            })?;
            self.refresher.refresh(&endpoint, current).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> GoogleProvider {
        let config = GoogleConfig::new()
            .with_base_url(server.uri())
            .with_token_path("/nonexistent/google-token.json")
            .with_time_zone("America/Chicago");
        GoogleProvider::new(config).unwrap()
    }

    fn exam_event() -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2025, 3, 27, 1, 0, 0).unwrap();
        CalendarEvent {
            id: None,
            title: "CS 225: Midterm 1".into(),
            start,
            end: start + chrono::Duration::minutes(90),
            location: "Room A".into(),
            notes: "Synced Automatically".into(),
        }
    }

    #[tokio::test]
    async fn default_calendar_is_primary() {
        let server = MockServer::start().await;
        let provider = provider(&server);
        assert_eq!(provider.resolve_calendar("t", None).await.unwrap(), "primary");
        assert_eq!(provider.page_cap(), 2500);
    }

    #[tokio::test]
    async fn list_events_reads_single_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("maxResults", "2500"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "id": "e1", "summary": "Quiz",
                    "start": {"dateTime": "2025-03-27T01:00:00Z"},
                    "end": {"dateTime": "2025-03-27T01:50:00Z"},
                    "description": "Synced Automatically"
                }],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let events = provider(&server).list_events("tok", "primary").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].match_key().as_str(), "Quiz::50");
    }

    #[tokio::test]
    async fn create_event_posts_summary_location_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(body_partial_json(serde_json::json!({
                "summary": "CS 225: Midterm 1",
                "location": "Room A",
                "description": "Synced Automatically",
                "start": {"dateTime": "2025-03-27T01:00:00.000Z", "timeZone": "America/Chicago"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "g-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let created = provider(&server)
            .create_event("tok", "primary", &exam_event())
            .await
            .unwrap();
        assert_eq!(created.id.as_deref(), Some("g-1"));
    }

    #[tokio::test]
    async fn rejected_create_carries_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "Invalid start time."}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .create_event("tok", "primary", &exam_event())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::BadRequest);
        assert!(err.message().contains("Invalid start time."));
        assert_eq!(err.provider(), Some("google"));
    }

    #[tokio::test]
    async fn named_calendar_is_created_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "me@example.com", "summary": "Me", "primary": true}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/calendars"))
            .and(body_partial_json(serde_json::json!({"summary": "Exams"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "exams-cal", "summary": "Exams"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = provider(&server)
            .resolve_calendar("tok", Some("Exams"))
            .await
            .unwrap();
        assert_eq!(id, "exams-cal");
    }

    #[tokio::test]
    async fn unauthorized_listing_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
            .mount(&server)
            .await;

        let err = provider(&server).list_events("bad", "primary").await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn refresh_requires_credentials() {
        let server = MockServer::start().await;
        let err = provider(&server)
            .refresh_tokens(&TokenInfo::new("a", Some("r".into()), None, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }
}
