//! Process-wide sync context.
//!
//! Owns the configured providers and the preference and state stores, and
//! serializes every calendar-mutating request behind one async mutex.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use examsync_core::{NormalizedExam, compose_notes, normalize_exams, parse_exam_payload};
use examsync_protocol::{
    DeletedEvent, ProviderStatus, StatusInfo, SyncReport, UnchangedReason,
};
use examsync_providers::{CalendarProvider, ProviderError, ProviderErrorCode};

use crate::error::{SyncError, SyncResult};
use crate::guard::{self, GuardDecision};
use crate::prefs::{PreferenceStore, Preferences, ProviderKind};
use crate::reconcile;
use crate::store::StateStore;
use crate::sweep;

/// Result of an `exam_changed` trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The guard accepted the trigger and a sync ran.
    Synced(SyncReport),
    /// The guard dropped the trigger.
    Unchanged(UnchangedReason),
}

/// Shared state of the running daemon.
pub struct SyncContext {
    providers: HashMap<ProviderKind, Arc<dyn CalendarProvider>>,
    prefs: PreferenceStore,
    store: StateStore,
    sync_lock: Mutex<()>,
    start_time: DateTime<Utc>,
}

impl SyncContext {
    /// Creates a context with no providers.
    pub fn new(prefs: PreferenceStore, store: StateStore) -> Self {
        Self {
            providers: HashMap::new(),
            prefs,
            store,
            sync_lock: Mutex::new(()),
            start_time: Utc::now(),
        }
    }

    /// Registers the adapter for a provider kind.
    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn CalendarProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    /// Returns the state store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Returns the preference store.
    pub fn preferences(&self) -> &PreferenceStore {
        &self.prefs
    }

    /// Returns the daemon uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.start_time).num_seconds().max(0) as u64
    }

    /// Handles a scraper trigger: stores the payload and syncs, unless the
    /// guard drops it.
    pub async fn exam_changed(&self, payload: &str) -> SyncResult<TriggerOutcome> {
        let _guard = self.sync_lock.lock().await;

        let prefs = self.prefs.load()?;
        let state = self.store.load()?;
        let now = Utc::now();

        if let GuardDecision::Reject(reason) =
            guard::evaluate(payload, &state, now, prefs.min_sync_interval())
        {
            debug!(?reason, "trigger dropped");
            return Ok(TriggerOutcome::Unchanged(reason));
        }

        self.store.record_trigger(payload, now)?;
        self.run_sync(&prefs, payload)
            .await
            .map(TriggerOutcome::Synced)
    }

    /// Syncs the given payload without consulting the guard or storing it.
    pub async fn sync_calendar(&self, payload: &str) -> SyncResult<SyncReport> {
        let _guard = self.sync_lock.lock().await;
        let prefs = self.prefs.load()?;
        self.run_sync(&prefs, payload).await
    }

    /// Replays the last accepted exam payload.
    pub async fn force_sync(&self) -> SyncResult<SyncReport> {
        let _guard = self.sync_lock.lock().await;
        let prefs = self.prefs.load()?;
        let payload = self.store.exam_state()?.ok_or(SyncError::NoExamState)?;
        info!("forcing sync of stored exam state");
        self.run_sync(&prefs, &payload).await
    }

    /// Removes every managed event from the preferred provider.
    pub async fn delete_synced(&self) -> SyncResult<Vec<DeletedEvent>> {
        let _guard = self.sync_lock.lock().await;
        let prefs = self.prefs.load()?;
        let provider = self.provider(prefs.preferred_provider)?;
        let token = access_token(provider.as_ref())?;

        let deleted = sweep::delete_synced(provider.as_ref(), &token, &prefs.event_tag).await?;
        Ok(deleted)
    }

    /// Refreshes the access token of every provider holding a refresh token.
    ///
    /// Returns the providers whose token was renewed. Fails only when at
    /// least one refresh was attempted and none succeeded.
    pub async fn refresh_tokens(&self) -> SyncResult<Vec<String>> {
        let _guard = self.sync_lock.lock().await;
        let mut refreshed = Vec::new();
        let mut last_error: Option<ProviderError> = None;

        for kind in ProviderKind::ALL {
            let Some(provider) = self.providers.get(&kind) else {
                continue;
            };
            let storage = provider.token_storage();
            let current = match storage.load() {
                Ok(Some(token)) if token.refresh_token().is_some() => token,
                Ok(_) => {
                    debug!(provider = %kind, "no refresh token; skipping");
                    continue;
                }
                Err(e) => {
                    warn!(provider = %kind, error = %e, "cannot read token file");
                    last_error = Some(e);
                    continue;
                }
            };

            match provider.refresh_tokens(&current).await {
                Ok(renewed) => match storage.save(&renewed) {
                    Ok(()) => {
                        info!(provider = %kind, expires_at = ?renewed.expires_at, "token refreshed");
                        refreshed.push(kind.to_string());
                    }
                    Err(e) => {
                        warn!(provider = %kind, error = %e, "cannot save refreshed token");
                        last_error = Some(e);
                    }
                },
                Err(e) => {
                    warn!(provider = %kind, error = %e, "token refresh failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if refreshed.is_empty() => Err(e.into()),
            _ => Ok(refreshed),
        }
    }

    /// Builds the daemon status.
    pub fn status(&self) -> SyncResult<StatusInfo> {
        let prefs = self.prefs.load()?;
        let state = self.store.load()?;

        let mut info = StatusInfo::new(self.uptime_seconds(), prefs.preferred_provider.as_str())
            .with_exam_state(state.exam_state.is_some());
        if let Some(name) = prefs.calendar_name() {
            info = info.with_calendar_name(name);
        }
        if let Some(at) = state.last_sync_at {
            info = info.with_last_sync(at, state.last_summary);
        }

        for kind in ProviderKind::ALL {
            let Some(provider) = self.providers.get(&kind) else {
                continue;
            };
            let mut status = match provider.token_storage().load() {
                Ok(Some(token)) => ProviderStatus {
                    name: kind.to_string(),
                    has_token: token.access_token().is_some(),
                    can_refresh: token.refresh_token().is_some(),
                    expires_at: token.expires_at,
                    calendar_id: None,
                },
                Ok(None) => ProviderStatus::missing(kind.as_str()),
                Err(e) => {
                    warn!(provider = %kind, error = %e, "cannot read token file");
                    ProviderStatus::missing(kind.as_str())
                }
            };
            status.calendar_id = state
                .calendar_ids
                .get(&crate::store::calendar_key(kind.as_str(), prefs.calendar_name()))
                .cloned();
            info = info.with_provider(status);
        }

        Ok(info)
    }

    fn provider(&self, kind: ProviderKind) -> SyncResult<&Arc<dyn CalendarProvider>> {
        self.providers
            .get(&kind)
            .ok_or_else(|| SyncError::ProviderNotConfigured {
                provider: kind.to_string(),
            })
    }

    async fn run_sync(&self, prefs: &Preferences, payload: &str) -> SyncResult<SyncReport> {
        let records = parse_exam_payload(payload)?;
        let provider = self.provider(prefs.preferred_provider)?;
        let token = access_token(provider.as_ref())?;

        let (exams, unparsed) = normalize_for(prefs, &records);
        let calendar_id = self
            .resolve_calendar(provider.as_ref(), &token, prefs.calendar_name())
            .await?;

        let existing = match provider.list_events(&token, &calendar_id).await {
            Ok(events) => events,
            Err(e) => {
                if e.code() == ProviderErrorCode::NotFound {
                    warn!(calendar_id = %calendar_id, "cached calendar is gone; forgetting it");
                    self.store
                        .clear_calendar_id(provider.name(), prefs.calendar_name())?;
                }
                return Err(e.into());
            }
        };
        if listing_hit_cap(provider.as_ref(), existing.len()) {
            warn!(
                calendar_id = %calendar_id,
                count = existing.len(),
                "event listing reached the page cap; later events are not matched"
            );
        }

        let notes = compose_notes(&prefs.event_notes, &prefs.event_tag);
        let planned = reconcile::plan(&exams, &existing, &prefs.event_tag);
        let mut summary =
            reconcile::apply(provider.as_ref(), &token, &calendar_id, &planned, &notes).await;
        summary.unparsed = unparsed;

        self.store.record_sync(summary, Utc::now())?;
        info!(
            provider = %provider.name(),
            calendar_id = %calendar_id,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            unparsed = summary.unparsed,
            "sync finished"
        );

        Ok(SyncReport {
            provider: provider.name().to_string(),
            calendar_id,
            summary,
        })
    }

    async fn resolve_calendar(
        &self,
        provider: &dyn CalendarProvider,
        token: &str,
        calendar_name: Option<&str>,
    ) -> SyncResult<String> {
        if let Some(id) = self.store.calendar_id(provider.name(), calendar_name)? {
            debug!(calendar_id = %id, "using cached calendar id");
            return Ok(id);
        }

        let id = provider.resolve_calendar(token, calendar_name).await?;
        self.store
            .set_calendar_id(provider.name(), calendar_name, &id)?;
        Ok(id)
    }
}

/// True when a listing returned as many events as one page holds.
fn listing_hit_cap(provider: &dyn CalendarProvider, count: usize) -> bool {
    count >= provider.page_cap()
}

fn access_token(provider: &dyn CalendarProvider) -> SyncResult<String> {
    provider.token_storage().access_token().map_err(|e| {
        if e.code() == ProviderErrorCode::AuthenticationFailed {
            SyncError::NoToken {
                provider: provider.name().to_string(),
            }
        } else {
            SyncError::Provider(e)
        }
    })
}

/// Normalizes records in the observer's zone; returns the exams and the
/// number of records that could not be parsed.
fn normalize_for(
    prefs: &Preferences,
    records: &[examsync_core::ExamRecord],
) -> (Vec<NormalizedExam>, u32) {
    let results = match prefs.observer_timezone() {
        Some(tz) => normalize_exams(records, &Utc::now().with_timezone(&tz)),
        None => normalize_exams(records, &Local::now()),
    };

    let mut exams = Vec::with_capacity(results.len());
    let mut unparsed = 0;
    for result in results {
        match result {
            Ok(exam) => exams.push(exam),
            Err(e) => {
                warn!(error = %e, "skipping exam record");
                unparsed += 1;
            }
        }
    }
    (exams, unparsed)
}
