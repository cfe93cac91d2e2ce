//! Exam records as delivered by the scraper.
//!
//! An [`ExamRecord`] is the raw shape captured from the reservation page:
//! every field is free-form text except the duration, which is either a
//! human string (`"1 h 30 min"`) or an explicit start/end span. Records are
//! normalized into [`NormalizedExam`]s by [`crate::normalize`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single exam reservation captured by the scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRecord {
    /// Exam name as shown on the reservation page.
    pub name: String,
    /// Free-form date string (e.g. `"Wed, Mar 26, 8pm (CDT)"`).
    pub date: String,
    /// Exam duration.
    #[serde(default)]
    pub duration: ExamDuration,
    /// Exam location.
    #[serde(default)]
    pub location: String,
}

impl ExamRecord {
    /// Creates a record with a textual duration.
    pub fn new(
        name: impl Into<String>,
        date: impl Into<String>,
        duration: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
            duration: ExamDuration::Text(duration.into()),
            location: location.into(),
        }
    }
}

/// Duration of an exam, either textual or as an explicit span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExamDuration {
    /// Human-readable duration such as `"1 h 50 min"` or `"45 min"`.
    Text(String),
    /// Explicit start and end timestamps.
    Span {
        /// Span start.
        start: SpanTime,
        /// Span end.
        end: SpanTime,
    },
}

impl Default for ExamDuration {
    fn default() -> Self {
        Self::Text("N/A".to_string())
    }
}

/// One end of a duration span.
///
/// Scraped payloads carry either a bare timestamp string or an object
/// with a `dateTime` field, the same shape calendar APIs use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpanTime {
    /// A bare timestamp string.
    Plain(String),
    /// A `{ "dateTime": "..." }` object.
    Wrapped {
        /// The timestamp string.
        #[serde(rename = "dateTime")]
        date_time: String,
    },
}

impl SpanTime {
    /// Returns the raw timestamp text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain(s) => s,
            Self::Wrapped { date_time } => date_time,
        }
    }
}

/// An exam with absolute start and end timestamps.
///
/// Invariant: `end > start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedExam {
    /// Cleaned exam name.
    pub name: String,
    /// Start of the exam.
    pub start: DateTime<Utc>,
    /// End of the exam.
    pub end: DateTime<Utc>,
    /// Cleaned exam location.
    pub location: String,
}

impl NormalizedExam {
    /// Returns the exam length in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        crate::time::minutes_between(self.start, self.end)
    }
}

/// Error returned when a payload is not a serialized exam list.
#[derive(Debug, Error)]
#[error("malformed exam data: {0}")]
pub struct MalformedExamData(#[from] serde_json::Error);

/// Parses the JSON-serialized exam list sent by the scraper.
///
/// An empty payload is treated as an empty list, matching what a force
/// sync sends before anything was ever scraped.
pub fn parse_exam_payload(payload: &str) -> Result<Vec<ExamRecord>, MalformedExamData> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_textual_duration() {
        let payload = r#"[{
            "name": "CS 225: Midterm 1",
            "date": "Wed, Mar 26, 8pm (CDT)",
            "duration": "1 h 50 min",
            "location": "Grainger Library 057"
        }]"#;

        let exams = parse_exam_payload(payload).unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(exams[0].duration, ExamDuration::Text("1 h 50 min".into()));
    }

    #[test]
    fn parses_span_duration_in_both_shapes() {
        let payload = r#"[
            {"name": "A", "date": "x", "location": "",
             "duration": {"start": "2025-03-26T20:00:00Z", "end": "2025-03-26T20:25:00Z"}},
            {"name": "B", "date": "x", "location": "",
             "duration": {"start": {"dateTime": "2025-03-26T20:00:00Z"},
                          "end": {"dateTime": "2025-03-26T21:00:00Z"}}}
        ]"#;

        let exams = parse_exam_payload(payload).unwrap();
        match &exams[0].duration {
            ExamDuration::Span { start, end } => {
                assert_eq!(start.as_str(), "2025-03-26T20:00:00Z");
                assert_eq!(end.as_str(), "2025-03-26T20:25:00Z");
            }
            other => panic!("unexpected duration {other:?}"),
        }
        assert!(matches!(
            &exams[1].duration,
            ExamDuration::Span { start: SpanTime::Wrapped { .. }, .. }
        ));
    }

    #[test]
    fn missing_duration_defaults_to_placeholder() {
        let exams = parse_exam_payload(r#"[{"name": "A", "date": "x"}]"#).unwrap();
        assert_eq!(exams[0].duration, ExamDuration::Text("N/A".into()));
        assert!(exams[0].location.is_empty());
    }

    #[test]
    fn empty_payload_is_empty_list() {
        assert!(parse_exam_payload("").unwrap().is_empty());
        assert!(parse_exam_payload("   ").unwrap().is_empty());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(parse_exam_payload("not json").is_err());
        assert!(parse_exam_payload(r#"{"name": "A"}"#).is_err());
        assert!(parse_exam_payload(r#"[{"date": "x"}]"#).is_err());
    }
}
