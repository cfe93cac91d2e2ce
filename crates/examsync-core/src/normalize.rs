//! Exam normalization pipeline.
//!
//! Converts scraped [`ExamRecord`]s into [`NormalizedExam`]s:
//!
//! 1. Clean the name (drop the first parenthetical term) and the location
//!    (drop a leading `CBTF:` label, keep the first line)
//! 2. Parse the free-form date string in the observer's timezone
//! 3. Parse the duration into minutes, defaulting to 60
//!
//! Parsing never panics: an unrecognized date yields `None` from
//! [`parse_exam_datetime`] and a [`NormalizeError`] from [`normalize_exam`],
//! so callers can skip that record and keep going.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Offset, TimeZone, Utc};
use regex::Regex;
use thiserror::Error;

use crate::exam::{ExamDuration, ExamRecord, NormalizedExam};
use crate::time::{minutes_between, parse_timestamp};

/// Minutes assumed when a duration cannot be parsed.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Longest duration accepted before falling back to the default (one week).
pub const MAX_DURATION_MINUTES: i64 = 7 * 24 * 60;

/// `Ddd, Mon D, H[:MM]am|pm` with an optional comma after the day.
static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]{3}),\s*([a-z]{3})\s+(\d{1,2}),?\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)$")
        .expect("Invalid date regex")
});

/// `today, H[:MM]am|pm` / `tomorrow, H[:MM]am|pm`.
static RELATIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(today|tomorrow),?\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)$")
        .expect("Invalid relative date regex")
});

static PARENTHETICAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)").expect("Invalid parenthetical regex"));

static HOURS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*h(?:ours?|rs?)?(?:\s*(\d+)\s*m)?").expect("Invalid hours regex")
});

static MINUTES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*min").expect("Invalid minutes regex"));

static LOCATION_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*CBTF:\s*").expect("Invalid location label regex"));

/// Errors produced while normalizing a single exam record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The date string did not match any supported pattern.
    #[error("could not parse date for exam {name:?}: {date:?}")]
    UnparseableDate {
        /// Exam name.
        name: String,
        /// The offending date string.
        date: String,
    },
    /// Start plus duration is outside the representable range.
    #[error("end time out of range for exam {name:?}")]
    EndOutOfRange {
        /// Exam name.
        name: String,
    },
}

/// Removes the first parenthetical term from an exam name.
///
/// `"CS 173 (Sp25): Final Exam"` becomes `"CS 173: Final Exam"`.
pub fn clean_exam_name(raw: &str) -> String {
    PARENTHETICAL_REGEX.replacen(raw, 1, "").trim().to_string()
}

/// Strips the `CBTF:` label and any description lines from a location.
///
/// `"CBTF: Grainger Library 057\nRoom 057 in the basement"` becomes
/// `"Grainger Library 057"`.
pub fn clean_exam_location(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or_default();
    LOCATION_LABEL_REGEX
        .replace(first_line, "")
        .trim()
        .to_string()
}

fn month_number(abbr: &str) -> Option<u32> {
    let month = match abbr.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Converts a 12-hour clock reading to a 24-hour one.
fn to_24_hour(hour: u32, meridian: &str) -> Option<u32> {
    if !(1..=12).contains(&hour) {
        return None;
    }
    let pm = meridian.eq_ignore_ascii_case("pm");
    Some(match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    })
}

fn local_instant<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    if let Some(instant) = tz.from_local_datetime(&naive).earliest() {
        return Some(instant);
    }
    // Inside a gap: shift by the offset change measured across it.
    let before = tz.from_local_datetime(&(naive - Duration::hours(3))).earliest()?;
    let after = tz.from_local_datetime(&(naive + Duration::hours(3))).latest()?;
    let gap = after.offset().fix().local_minus_utc() - before.offset().fix().local_minus_utc();
    let shifted = naive + Duration::seconds(i64::from(gap));
    tz.from_local_datetime(&shifted).earliest()
}

/// Parses a scraped exam date relative to the observer's clock.
///
/// Supported inputs look like `"Mon, Jan 5, 2:30pm"` or
/// `"Wed, Mar 26, 8pm (CDT)"`, may contain non-breaking spaces, and may
/// start with `today,` / `tomorrow,` instead of the weekday and date. The
/// year is taken from `now`, and the result is expressed in `now`'s
/// timezone.
///
/// A wall-clock time that falls in a daylight-saving gap (spring forward)
/// is moved forward by the length of the gap, so `2:30am` on the
/// transition day resolves to `3:30am` daylight time. An ambiguous time
/// (fall back) resolves to its earlier instant.
pub fn parse_exam_datetime<Tz: TimeZone>(input: &str, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let normalized = input.replace('\u{00A0}', " ");
    let stripped = PARENTHETICAL_REGEX.replacen(normalized.trim(), 1, "");
    let text = stripped.trim();
    let tz = now.timezone();

    if let Some(caps) = RELATIVE_REGEX.captures(text) {
        let today = now.date_naive();
        let date = if caps[1].eq_ignore_ascii_case("tomorrow") {
            today.succ_opt()?
        } else {
            today
        };
        let hour = to_24_hour(caps[2].parse().ok()?, &caps[4])?;
        let minute = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
        return local_instant(&tz, date, hour, minute);
    }

    let caps = DATE_REGEX.captures(text)?;
    let month = month_number(&caps[2])?;
    let day: u32 = caps[3].parse().ok()?;
    let hour = to_24_hour(caps[4].parse().ok()?, &caps[6])?;
    let minute: u32 = caps.get(5).map_or(Ok(0), |m| m.as_str().parse()).ok()?;

    let date = NaiveDate::from_ymd_opt(now.year(), month, day)?;
    local_instant(&tz, date, hour, minute)
}

/// Returns the exam length in minutes.
///
/// Text durations such as `"1 h 30 min"`, `"2 h"` and `"45 min"` are
/// parsed; spans use the rounded minute difference between their ends.
/// Anything else, including non-positive values and values above
/// [`MAX_DURATION_MINUTES`], yields [`DEFAULT_DURATION_MINUTES`].
pub fn duration_minutes(duration: &ExamDuration) -> i64 {
    let minutes = match duration {
        ExamDuration::Span { start, end } => {
            match (parse_timestamp(start.as_str()), parse_timestamp(end.as_str())) {
                (Some(start), Some(end)) => Some(minutes_between(start, end)),
                _ => None,
            }
        }
        ExamDuration::Text(text) => parse_duration_text(&text.replace('\u{00A0}', " ")),
    };

    minutes
        .filter(|m| (1..=MAX_DURATION_MINUTES).contains(m))
        .unwrap_or(DEFAULT_DURATION_MINUTES)
}

fn parse_duration_text(text: &str) -> Option<i64> {
    if let Some(caps) = HOURS_REGEX.captures(text) {
        let hours: i64 = caps[1].parse().ok()?;
        let minutes: i64 = caps.get(2).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
        return hours.checked_mul(60)?.checked_add(minutes);
    }
    MINUTES_REGEX
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Normalizes a single exam record.
pub fn normalize_exam<Tz: TimeZone>(
    record: &ExamRecord,
    now: &DateTime<Tz>,
) -> Result<NormalizedExam, NormalizeError> {
    let name = clean_exam_name(&record.name);
    let start = parse_exam_datetime(&record.date, now)
        .ok_or_else(|| NormalizeError::UnparseableDate {
            name: name.clone(),
            date: record.date.clone(),
        })?
        .with_timezone(&Utc);
    let end = Duration::try_minutes(duration_minutes(&record.duration))
        .and_then(|length| start.checked_add_signed(length))
        .ok_or_else(|| NormalizeError::EndOutOfRange { name: name.clone() })?;

    Ok(NormalizedExam {
        name,
        start,
        end,
        location: clean_exam_location(&record.location),
    })
}

/// Normalizes a batch of exam records, one result per record.
pub fn normalize_exams<Tz: TimeZone>(
    records: &[ExamRecord],
    now: &DateTime<Tz>,
) -> Vec<Result<NormalizedExam, NormalizeError>> {
    records.iter().map(|r| normalize_exam(r, now)).collect()
}
