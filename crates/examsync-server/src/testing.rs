//! In-memory calendar provider for engine and handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use examsync_core::CalendarEvent;
use examsync_providers::{
    BoxFuture, CalendarInfo, CalendarProvider, ProviderError, ProviderResult, TokenInfo,
    TokenStorage,
};

pub struct FakeProvider {
    name: String,
    calendars: Vec<CalendarInfo>,
    events: Mutex<HashMap<String, Vec<CalendarEvent>>>,
    calls: Mutex<Vec<String>>,
    failing_create: Option<String>,
    failing_delete: Option<String>,
    failing_list: bool,
    page_cap: usize,
    storage: TokenStorage,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            name: "outlook".into(),
            calendars: Vec::new(),
            events: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing_create: None,
            failing_delete: None,
            failing_list: false,
            page_cap: 100,
            storage: TokenStorage::new("/nonexistent/fake-token.json"),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_storage(mut self, storage: TokenStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_calendar(mut self, calendar: CalendarInfo, events: Vec<CalendarEvent>) -> Self {
        self.events
            .lock()
            .unwrap()
            .insert(calendar.id.clone(), events);
        self.calendars.push(calendar);
        self
    }

    pub fn failing_create(mut self, title: &str) -> Self {
        self.failing_create = Some(title.into());
        self
    }

    pub fn failing_delete(mut self, event_id: &str) -> Self {
        self.failing_delete = Some(event_id.into());
        self
    }

    pub fn with_page_cap(mut self, page_cap: usize) -> Self {
        self.page_cap = page_cap;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.failing_list = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that changed the calendar.
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.starts_with("create ") || c.starts_with("update ") || c.starts_with("delete ")
            })
            .collect()
    }

    pub fn events(&self, calendar_id: &str) -> Vec<CalendarEvent> {
        self.events
            .lock()
            .unwrap()
            .get(calendar_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CalendarProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_cap(&self) -> usize {
        self.page_cap
    }

    fn token_storage(&self) -> &TokenStorage {
        &self.storage
    }

    fn default_calendar<'a>(&'a self, _token: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.record("default-calendar".into());
            Ok("default".to_string())
        })
    }

    fn list_calendars<'a>(
        &'a self,
        _token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarInfo>>> {
        Box::pin(async move {
            self.record("list-calendars".into());
            Ok(self.calendars.clone())
        })
    }

    fn create_calendar<'a>(
        &'a self,
        _token: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        Box::pin(async move {
            self.record(format!("create-calendar {name}"));
            Ok(CalendarInfo::new(format!("cal-{}", name.to_lowercase()), name))
        })
    }

    fn list_events<'a>(
        &'a self,
        _token: &'a str,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            self.record(format!("list {calendar_id}"));
            if self.failing_list {
                return Err(ProviderError::server("API error (500): listing failed"));
            }
            Ok(self.events(calendar_id))
        })
    }

    fn create_event<'a>(
        &'a self,
        _token: &'a str,
        calendar_id: &'a str,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        Box::pin(async move {
            self.record(format!("create {calendar_id} {}", event.title));
            if self.failing_create.as_deref() == Some(event.title.as_str()) {
                return Err(ProviderError::bad_request("API error (400): rejected"));
            }
            let mut events = self.events.lock().unwrap();
            let list = events.entry(calendar_id.to_string()).or_default();
            let created = event.clone().with_id(format!("new-{}", list.len() + 1));
            list.push(created.clone());
            Ok(created)
        })
    }

    fn update_event<'a>(
        &'a self,
        _token: &'a str,
        calendar_id: &'a str,
        event_id: &'a str,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.record(format!(
                "update {calendar_id} {event_id} {} @ {}",
                event.title, event.location
            ));
            Ok(())
        })
    }

    fn delete_event<'a>(
        &'a self,
        _token: &'a str,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.record(format!("delete {calendar_id} {event_id}"));
            if self.failing_delete.as_deref() == Some(event_id) {
                return Err(ProviderError::not_found("API error (404): gone"));
            }
            if let Some(list) = self.events.lock().unwrap().get_mut(calendar_id) {
                list.retain(|e| e.id.as_deref() != Some(event_id));
            }
            Ok(())
        })
    }

    fn refresh_tokens<'a>(
        &'a self,
        current: &'a TokenInfo,
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(async move {
            self.record("refresh".into());
            if current.refresh_token().is_none() {
                return Err(ProviderError::authentication("no refresh token stored"));
            }
            Ok(current.refreshed("refreshed-token", None, Some(3600), None))
        })
    }
}
