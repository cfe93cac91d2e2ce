//! [`CalendarProvider`] implementation for Outlook.

use examsync_core::CalendarEvent;
use tracing::warn;

use crate::error::{ProviderError, ProviderResult};
use crate::oauth::TokenRefresher;
use crate::provider::{BoxFuture, CalendarInfo, CalendarProvider};
use crate::tokens::{TokenInfo, TokenStorage};

use super::PROVIDER_NAME;
use super::client::{ApiEventPayload, OUTLOOK_PAGE_SIZE, OutlookCalendarClient};
use super::config::OutlookConfig;

/// Outlook calendar provider backed by Microsoft Graph.
pub struct OutlookProvider {
    config: OutlookConfig,
    client: OutlookCalendarClient,
    refresher: TokenRefresher,
    token_storage: TokenStorage,
}

impl OutlookProvider {
    /// Creates a provider from its configuration.
    pub fn new(config: OutlookConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: OutlookCalendarClient::new(&config.base_url, config.timeout)?,
            refresher: TokenRefresher::new(PROVIDER_NAME, config.timeout)?,
            token_storage: TokenStorage::new(&config.token_path),
            config,
        })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &OutlookConfig {
        &self.config
    }
}

impl CalendarProvider for OutlookProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn page_cap(&self) -> usize {
        OUTLOOK_PAGE_SIZE
    }

    fn token_storage(&self) -> &TokenStorage {
        &self.token_storage
    }

    fn default_calendar<'a>(&'a self, token: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(self.client.default_calendar(token))
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
            let payload = ApiEventPayload::from_event(event);
            match self.client.create_event(token, calendar_id, &payload).await {
                Ok(id) => Ok(event.clone().with_id(id)),
                Err(e) => {
                    warn!(title = %event.title, error = %e, "failed to create Outlook event");
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
            let payload = ApiEventPayload::from_event(event);
            let result = self
                .client
                .patch_event(token, calendar_id, event_id, &payload)
                .await;
            if let Err(e) = &result {
                warn!(title = %event.title, error = %e, "failed to update Outlook event");
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
                ProviderError::configuration("outlook.client_id is not configured")
                    .with_provider(PROVIDER_NAME)
            })?;
            self.refresher.refresh(&endpoint, current).await
        })
    }
}
