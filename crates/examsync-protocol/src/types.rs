//! Request and response types exchanged between the CLI and the sync daemon.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PROTOCOL_VERSION;

/// Message envelope wrapping all protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Protocol version (always "1" for v1).
    pub protocol_version: String,
    /// Unique request ID for correlation.
    pub request_id: String,
    /// The actual payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Creates a new envelope with the current protocol version.
    pub fn new(request_id: impl Into<String>, payload: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            request_id: request_id.into(),
            payload,
        }
    }

    /// Creates a request envelope.
    pub fn request(request_id: impl Into<String>, request: T) -> Self {
        Self::new(request_id, request)
    }

    /// Creates a response envelope.
    pub fn response(request_id: impl Into<String>, response: T) -> Self {
        Self::new(request_id, response)
    }

    /// Checks if this envelope uses a compatible protocol version.
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}

/// Actions a client can ask the daemon to perform.
///
/// `exam_data` is the scraper's JSON-serialized exam list, passed through
/// verbatim so the daemon can compare it against the last stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// The scraper observed a (possibly) new exam list. Subject to
    /// duplicate suppression.
    ExamChanged {
        /// Serialized exam list.
        exam_data: String,
    },

    /// Sync the given exam list unconditionally.
    SyncCalendar {
        /// Serialized exam list.
        exam_data: String,
    },

    /// Re-sync the last stored exam list, bypassing duplicate suppression.
    ForceSync,

    /// Delete every managed event across all calendars.
    DeleteSynced,

    /// Refresh provider access tokens using stored refresh tokens.
    RefreshTokens,

    /// Get daemon status.
    Status,

    /// Request daemon shutdown.
    Shutdown,

    /// Liveness check.
    Ping,
}

impl Request {
    /// Creates an ExamChanged request.
    pub fn exam_changed(exam_data: impl Into<String>) -> Self {
        Self::ExamChanged {
            exam_data: exam_data.into(),
        }
    }

    /// Creates a SyncCalendar request.
    pub fn sync_calendar(exam_data: impl Into<String>) -> Self {
        Self::SyncCalendar {
            exam_data: exam_data.into(),
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExamChanged { .. } => "exam_changed",
            Self::SyncCalendar { .. } => "sync_calendar",
            Self::ForceSync => "force_sync",
            Self::DeleteSynced => "delete_synced",
            Self::RefreshTokens => "refresh_tokens",
            Self::Status => "status",
            Self::Shutdown => "shutdown",
            Self::Ping => "ping",
        }
    }
}

/// Responses sent by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// A sync ran to completion.
    Sync {
        /// Outcome of the sync.
        #[serde(flatten)]
        report: SyncReport,
    },

    /// An `exam_changed` message did not trigger a sync.
    Unchanged {
        /// Why the sync was suppressed.
        reason: UnchangedReason,
    },

    /// The deletion sweep finished.
    Deleted {
        /// Events that were removed.
        events: Vec<DeletedEvent>,
    },

    /// Token refresh finished.
    TokensRefreshed {
        /// Providers whose access token was renewed.
        providers: Vec<String>,
    },

    /// Daemon status information.
    Status {
        /// Status details.
        #[serde(flatten)]
        info: StatusInfo,
    },

    /// Generic success response.
    Ok,

    /// Error response.
    Error {
        /// Error details.
        #[serde(flatten)]
        error: ErrorResponse,
    },

    /// Pong response to Ping.
    Pong,
}

impl Response {
    /// Creates a Sync response.
    pub fn sync(report: SyncReport) -> Self {
        Self::Sync { report }
    }

    /// Creates an Unchanged response.
    pub fn unchanged(reason: UnchangedReason) -> Self {
        Self::Unchanged { reason }
    }

    /// Creates a Deleted response.
    pub fn deleted(events: Vec<DeletedEvent>) -> Self {
        Self::Deleted { events }
    }

    /// Creates a Status response.
    pub fn status(info: StatusInfo) -> Self {
        Self::Status { info }
    }

    /// Creates an Error response.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            error: ErrorResponse::new(code, message),
        }
    }

    /// Creates an error response from an ErrorResponse.
    pub fn from_error(error: ErrorResponse) -> Self {
        Self::Error { error }
    }

    /// Returns true unless this is an error response.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }

    /// Returns the error if this is an error response.
    pub fn as_error(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// Counters produced by one sync.
///
/// `failed` and `unparsed` are diagnostics; they are never folded into
/// `created`, `updated` or `skipped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Events created.
    pub created: u32,
    /// Managed events patched with a new location.
    pub updated: u32,
    /// Exams already present (or owned by the user).
    pub skipped: u32,
    /// Create/update calls that the provider rejected.
    #[serde(default)]
    pub failed: u32,
    /// Records whose date could not be parsed.
    #[serde(default)]
    pub unparsed: u32,
}

impl SyncSummary {
    /// Number of exams that reached a decision.
    pub fn total(&self) -> u32 {
        self.created + self.updated + self.skipped
    }
}

/// A sync summary with the target it ran against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Provider name (`"outlook"` or `"google"`).
    pub provider: String,
    /// Calendar the events were written to.
    pub calendar_id: String,
    /// Counters.
    #[serde(flatten)]
    pub summary: SyncSummary,
}

/// Why an `exam_changed` message was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnchangedReason {
    /// The payload equals the last stored exam state.
    Identical,
    /// The previous trigger was too recent.
    Throttled,
}

impl std::fmt::Display for UnchangedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identical => f.write_str("exam list unchanged"),
            Self::Throttled => f.write_str("sync throttled"),
        }
    }
}

/// One event removed by the deletion sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEvent {
    /// Title of the deleted event.
    pub event_name: String,
    /// Display name of the calendar it lived in.
    pub calendar_name: String,
}

/// Daemon status information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    /// Daemon uptime in seconds.
    pub uptime_seconds: u64,

    /// Provider used for syncs.
    pub preferred_provider: String,

    /// Target calendar name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_name: Option<String>,

    /// When the last sync finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,

    /// Counters from the last sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_summary: Option<SyncSummary>,

    /// Whether an exam list has been stored.
    pub has_exam_state: bool,

    /// Token state of each provider.
    pub providers: Vec<ProviderStatus>,
}

impl StatusInfo {
    /// Creates a new StatusInfo.
    pub fn new(uptime_seconds: u64, preferred_provider: impl Into<String>) -> Self {
        Self {
            uptime_seconds,
            preferred_provider: preferred_provider.into(),
            calendar_name: None,
            last_sync: None,
            last_summary: None,
            has_exam_state: false,
            providers: Vec::new(),
        }
    }

    /// Builder: set calendar_name.
    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = Some(name.into());
        self
    }

    /// Builder: set last_sync and last_summary.
    pub fn with_last_sync(mut self, at: DateTime<Utc>, summary: Option<SyncSummary>) -> Self {
        self.last_sync = Some(at);
        self.last_summary = summary;
        self
    }

    /// Builder: set has_exam_state.
    pub fn with_exam_state(mut self, present: bool) -> Self {
        self.has_exam_state = present;
        self
    }

    /// Builder: add a provider status.
    pub fn with_provider(mut self, provider: ProviderStatus) -> Self {
        self.providers.push(provider);
        self
    }
}

/// Token state of a calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Provider name.
    pub name: String,
    /// Whether an access token is stored.
    pub has_token: bool,
    /// Whether a refresh token is stored.
    pub can_refresh: bool,
    /// Access token expiry, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Cached calendar id, when resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
}

impl ProviderStatus {
    /// Creates a status for a provider without a token.
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_token: false,
            can_refresh: false,
            expires_at: None,
            calendar_id: None,
        }
    }
}

/// Error codes for protocol errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unknown or internal error.
    InternalError,
    /// Invalid request format.
    InvalidRequest,
    /// Request timed out.
    Timeout,
    /// No access token is stored for the provider.
    NoToken,
    /// The exam payload is not a serialized exam list.
    MalformedExamData,
    /// Provider authentication failed.
    AuthenticationFailed,
    /// Provider returned an error.
    ProviderError,
    /// Rate limited by provider.
    RateLimited,
    /// Requested resource not found.
    NotFound,
    /// Daemon is shutting down.
    ShuttingDown,
}

impl ErrorCode {
    /// Returns a human-readable description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InternalError => "An internal error occurred",
            Self::InvalidRequest => "The request was invalid",
            Self::Timeout => "The request timed out",
            Self::NoToken => "No token",
            Self::MalformedExamData => "Malformed exam data",
            Self::AuthenticationFailed => "Authentication failed",
            Self::ProviderError => "Calendar provider returned an error",
            Self::RateLimited => "Rate limited by calendar provider",
            Self::NotFound => "Requested resource not found",
            Self::ShuttingDown => "Daemon is shutting down",
        }
    }
}

/// Error response details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl std::error::Error for ErrorResponse {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn envelope_version() {
        let envelope = Envelope::request("req-123", Request::Ping);
        assert_eq!(envelope.protocol_version, "1");
        assert!(envelope.is_compatible());

        let old = Envelope {
            protocol_version: "0".to_string(),
            request_id: "req-123".to_string(),
            payload: Request::Ping,
        };
        assert!(!old.is_compatible());
    }

    #[test]
    fn unit_requests_are_bare_tags() {
        assert_eq!(serde_json::to_string(&Request::ForceSync).unwrap(), r#"{"type":"force_sync"}"#);
        assert_eq!(
            serde_json::to_string(&Request::DeleteSynced).unwrap(),
            r#"{"type":"delete_synced"}"#
        );
        assert_eq!(
            serde_json::to_string(&Request::RefreshTokens).unwrap(),
            r#"{"type":"refresh_tokens"}"#
        );
    }

    #[test]
    fn exam_changed_wire_format() {
        let request = Request::exam_changed(r#"[{"name":"A"}]"#);
        insta::assert_json_snapshot!(request, @r#"
        {
          "type": "exam_changed",
          "exam_data": "[{\"name\":\"A\"}]"
        }
        "#);

        let json = serde_json::to_string(&request).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind(), "exam_changed");
    }

    #[test]
    fn sync_response_flattens_summary() {
        let response = Response::sync(SyncReport {
            provider: "outlook".into(),
            calendar_id: "cal-1".into(),
            summary: SyncSummary {
                created: 2,
                updated: 1,
                skipped: 3,
                failed: 0,
                unparsed: 1,
            },
        });
        insta::assert_json_snapshot!(response, @r#"
        {
          "type": "sync",
          "provider": "outlook",
          "calendar_id": "cal-1",
          "created": 2,
          "updated": 1,
          "skipped": 3,
          "failed": 0,
          "unparsed": 1
        }
        "#);
    }

    #[test]
    fn summary_diagnostics_default_to_zero() {
        let summary: SyncSummary =
            serde_json::from_str(r#"{"created":1,"updated":0,"skipped":2}"#).unwrap();
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.unparsed, 0);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn deleted_response_wire_format() {
        let response = Response::deleted(vec![DeletedEvent {
            event_name: "CS 225: Midterm 1".into(),
            calendar_name: "Exams".into(),
        }]);
        insta::assert_json_snapshot!(response, @r#"
        {
          "type": "deleted",
          "events": [
            {
              "event_name": "CS 225: Midterm 1",
              "calendar_name": "Exams"
            }
          ]
        }
        "#);
    }

    #[test]
    fn unchanged_reason_serde() {
        let json = serde_json::to_string(&Response::unchanged(UnchangedReason::Throttled)).unwrap();
        assert_eq!(json, r#"{"type":"unchanged","reason":"throttled"}"#);
        assert_eq!(UnchangedReason::Identical.to_string(), "exam list unchanged");
    }

    #[test]
    fn status_roundtrip() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let info = StatusInfo::new(90, "google")
            .with_calendar_name("Exams")
            .with_last_sync(at, Some(SyncSummary::default()))
            .with_exam_state(true)
            .with_provider(ProviderStatus::missing("outlook"));
        let response = Response::status(info.clone());

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""preferred_provider":"google""#));
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Response::Status { info });
    }

    #[test]
    fn error_response() {
        let response = Response::error(ErrorCode::NoToken, "no token for outlook");
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"type":"error","code":"no_token","message":"no token for outlook"}"#
        );

        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert!(!parsed.is_success());
        let error = parsed.as_error().unwrap();
        assert_eq!(error.code, ErrorCode::NoToken);
        assert_eq!(error.to_string(), "No token: no token for outlook");
    }
}
