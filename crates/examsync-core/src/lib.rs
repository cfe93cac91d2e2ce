//! Core types: exam records, normalization, calendar events, logging

pub mod event;
pub mod exam;
pub mod normalize;
pub mod time;
pub mod tracing;

pub use event::{CalendarEvent, DEFAULT_EVENT_NOTES, DEFAULT_SYNC_TAG, MatchKey, compose_notes};
pub use exam::{
    ExamDuration, ExamRecord, MalformedExamData, NormalizedExam, SpanTime, parse_exam_payload,
};
pub use normalize::{
    DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES, NormalizeError, clean_exam_location,
    clean_exam_name, duration_minutes, normalize_exam, normalize_exams, parse_exam_datetime,
};
pub use time::{minutes_between, parse_timestamp};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
