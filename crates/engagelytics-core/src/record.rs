//! Row types flowing through the conversion pipeline.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Canonical text form used for storage and CSV output. Sub-second digits
/// are written only when present.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One visit by a user, restricted to the columns the analysis needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_ts: NaiveDateTime,
    pub user_id: String,
    pub session_number: i64,
    pub pageviews: i64,
}

/// One engagement event. Only the earliest per user matters downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementRecord {
    pub engaged_at: NaiveDateTime,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstEngagement {
    pub user_id: String,
    pub first_engagement: NaiveDateTime,
}

/// A session left-joined to its user's first engagement.
///
/// `first_engagement` is `None` when the user never engaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSession {
    pub session_ts: NaiveDateTime,
    pub user_id: String,
    pub session_number: i64,
    pub pageviews: i64,
    pub first_engagement: Option<NaiveDateTime>,
}

/// A pre-engagement session carrying the conversion label and the running
/// page-view total for its user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSession {
    pub session_ts: NaiveDateTime,
    pub user_id: String,
    pub session_number: i64,
    pub pageviews: i64,
    pub first_engagement: NaiveDateTime,
    pub is_conversion: bool,
    pub pageviews_cum_sum: i64,
}

const CALENDAR_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a calendar timestamp string. A bare date resolves to midnight.
pub fn parse_calendar_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    CALENDAR_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse integer seconds since the Unix epoch into a UTC calendar timestamp.
///
/// A zero fraction (`1500000000.0`) is tolerated since spreadsheet exports
/// often write integers that way.
pub fn parse_unix_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let whole = match raw.split_once('.') {
        Some((whole, frac)) if !frac.is_empty() && frac.chars().all(|c| c == '0') => whole,
        Some(_) => return None,
        None => raw,
    };
    let secs: i64 = whole.parse().ok()?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
