//! CalendarProvider trait definition.
//!
//! A provider translates provider-neutral [`CalendarEvent`] operations into
//! one calendar API. Every call takes the bearer token explicitly; tokens
//! are read fresh from [`TokenStorage`] by the caller before each sync.

use std::future::Future;
use std::pin::Pin;

use examsync_core::CalendarEvent;
use tracing::info;

use crate::error::ProviderResult;
use crate::tokens::{TokenInfo, TokenStorage};

/// Information about a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    /// Provider identifier of the calendar.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether this is the account's default calendar.
    pub is_default: bool,
}

impl CalendarInfo {
    /// Creates a new CalendarInfo with the given ID and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_default: false,
        }
    }

    /// Builder method to mark as the default calendar.
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A calendar backend the sync engine can write to.
///
/// Listing is single-page: at most [`page_cap`](Self::page_cap) events are
/// returned per calendar and continuation cursors are not followed.
pub trait CalendarProvider: Send + Sync {
    /// Returns the provider name (`"outlook"`, `"google"`).
    fn name(&self) -> &str;

    /// Maximum number of events a single listing returns.
    fn page_cap(&self) -> usize;

    /// Storage holding this provider's token.
    fn token_storage(&self) -> &TokenStorage;

    /// Returns the id of the account's default calendar.
    fn default_calendar<'a>(&'a self, token: &'a str) -> BoxFuture<'a, ProviderResult<String>>;

    /// Lists the account's calendars.
    fn list_calendars<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarInfo>>>;

    /// Creates a calendar with the given name.
    fn create_calendar<'a>(
        &'a self,
        token: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, ProviderResult<CalendarInfo>>;

    /// Lists the events of one calendar (first page only).
    fn list_events<'a>(
        &'a self,
        token: &'a str,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>>;

    /// Creates an event and returns it with its new id.
    fn create_event<'a>(
        &'a self,
        token: &'a str,
        calendar_id: &'a str,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>>;

    /// Patches an existing event with the fields of `event`.
    fn update_event<'a>(
        &'a self,
        token: &'a str,
        calendar_id: &'a str,
        event_id: &'a str,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Deletes an event.
    fn delete_event<'a>(
        &'a self,
        token: &'a str,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Exchanges the stored refresh token for a new access token.
    fn refresh_tokens<'a>(&'a self, current: &'a TokenInfo)
    -> BoxFuture<'a, ProviderResult<TokenInfo>>;

    /// Resolves the calendar to sync into.
    ///
    /// Without a name, the account's default calendar is used. With a
    /// name, the calendar with exactly that name is used, and created when
    /// missing.
    fn resolve_calendar<'a>(
        &'a self,
        token: &'a str,
        name: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
                return self.default_calendar(token).await;
            };

            let calendars = self.list_calendars(token).await?;
            if let Some(found) = calendars.into_iter().find(|c| c.name == name) {
                return Ok(found.id);
            }

            info!(provider = %self.name(), calendar = %name, "creating calendar");
            let created = self.create_calendar(token, name).await?;
            Ok(created.id)
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory provider used to exercise trait default methods.

    use std::sync::Mutex;

    use super::*;
    use crate::error::ProviderError;

    pub struct StaticProvider {
        pub calendars: Vec<CalendarInfo>,
        pub created: Mutex<Vec<String>>,
        pub storage: TokenStorage,
    }

    impl StaticProvider {
        pub fn new(calendars: Vec<CalendarInfo>) -> Self {
            Self {
                calendars,
                created: Mutex::new(Vec::new()),
                storage: TokenStorage::new("/nonexistent/token.json"),
            }
        }
    }

    impl CalendarProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        fn page_cap(&self) -> usize {
            10
        }

        fn token_storage(&self) -> &TokenStorage {
            &self.storage
        }

        fn default_calendar<'a>(&'a self, _token: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
            Box::pin(async { Ok("default-cal".to_string()) })
        }

        fn list_calendars<'a>(
            &'a self,
            _token: &'a str,
        ) -> BoxFuture<'a, ProviderResult<Vec<CalendarInfo>>> {
            let calendars = self.calendars.clone();
            Box::pin(async move { Ok(calendars) })
        }

        fn create_calendar<'a>(
            &'a self,
            _token: &'a str,
            name: &'a str,
        ) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
            Box::pin(async move {
                self.created.lock().unwrap().push(name.to_string());
                Ok(CalendarInfo::new(format!("new-{name}"), name))
            })
        }

        fn list_events<'a>(
            &'a self,
            _token: &'a str,
            _calendar_id: &'a str,
        ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn create_event<'a>(
            &'a self,
            _token: &'a str,
            _calendar_id: &'a str,
            event: &'a CalendarEvent,
        ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
            Box::pin(async move { Ok(event.clone().with_id("e1")) })
        }

        fn update_event<'a>(
            &'a self,
            _token: &'a str,
            _calendar_id: &'a str,
            _event_id: &'a str,
            _event: &'a CalendarEvent,
        ) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn delete_event<'a>(
            &'a self,
            _token: &'a str,
            _calendar_id: &'a str,
            _event_id: &'a str,
        ) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn refresh_tokens<'a>(
            &'a self,
            _current: &'a TokenInfo,
        ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
            Box::pin(async { Err(ProviderError::configuration("refresh not configured")) })
        }
    }
}
