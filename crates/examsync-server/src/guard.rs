//! Duplicate suppression for `exam_changed` triggers.
//!
//! The scraper fires on every page mutation. A trigger starts a sync only
//! when its payload differs from the stored exam state and the previous
//! accepted trigger is at least the minimum interval old.

use std::time::Duration;

use chrono::{DateTime, Utc};

use examsync_protocol::UnchangedReason;

use crate::store::SyncState;

/// Outcome of evaluating a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Store the payload and sync.
    Accept,
    /// Drop the trigger.
    Reject(UnchangedReason),
}

/// Decides whether a trigger carrying `payload` starts a sync.
///
/// A missing stored state compares equal to the empty payload.
pub fn evaluate(
    payload: &str,
    state: &SyncState,
    now: DateTime<Utc>,
    min_interval: Duration,
) -> GuardDecision {
    if state.exam_state.as_deref().unwrap_or_default() == payload {
        return GuardDecision::Reject(UnchangedReason::Identical);
    }

    if let Some(last) = state.last_trigger_at {
        let elapsed = (now - last).to_std().unwrap_or_default();
        if elapsed < min_interval {
            return GuardDecision::Reject(UnchangedReason::Throttled);
        }
    }

    GuardDecision::Accept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const INTERVAL: Duration = Duration::from_secs(5);

    fn state(payload: &str, at: DateTime<Utc>) -> SyncState {
        SyncState {
            exam_state: Some(payload.to_string()),
            last_trigger_at: Some(at),
            ..Default::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_trigger_is_accepted() {
        let decision = evaluate(r#"[{"name":"A"}]"#, &SyncState::default(), t0(), INTERVAL);
        assert_eq!(decision, GuardDecision::Accept);
    }

    #[test]
    fn empty_payload_without_state_is_identical() {
        let decision = evaluate("", &SyncState::default(), t0(), INTERVAL);
        assert_eq!(decision, GuardDecision::Reject(UnchangedReason::Identical));
    }

    #[test]
    fn identical_payload_is_unchanged_even_after_interval() {
        let state = state("[1]", t0());
        let later = t0() + chrono::Duration::minutes(10);
        assert_eq!(
            evaluate("[1]", &state, later, INTERVAL),
            GuardDecision::Reject(UnchangedReason::Identical)
        );
    }

    #[test]
    fn changed_payload_inside_interval_is_throttled() {
        let state = state("[1]", t0());
        let soon = t0() + chrono::Duration::seconds(4);
        assert_eq!(
            evaluate("[2]", &state, soon, INTERVAL),
            GuardDecision::Reject(UnchangedReason::Throttled)
        );
    }

    #[test]
    fn changed_payload_after_interval_is_accepted() {
        let state = state("[1]", t0());
        let later = t0() + chrono::Duration::seconds(5);
        assert_eq!(evaluate("[2]", &state, later, INTERVAL), GuardDecision::Accept);
    }

    #[test]
    fn clock_going_backwards_counts_as_no_time_elapsed() {
        let state = state("[1]", t0());
        let earlier = t0() - chrono::Duration::seconds(30);
        assert_eq!(
            evaluate("[2]", &state, earlier, INTERVAL),
            GuardDecision::Reject(UnchangedReason::Throttled)
        );
    }
}
