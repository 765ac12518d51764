//! Time and timestamp helpers.
//!
//! Dates are persisted date-only but handed back to callers as full UTC
//! date-times. The parsing helpers here accept every shape the storage
//! layer may return for such a column.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// UTC timestamp used for `dob`, `registered_date`, etc.
pub type Timestamp = DateTime<Utc>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Midnight UTC of the given calendar day.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> Timestamp {
    NaiveDateTime::new(date, NaiveTime::MIN).and_utc()
}

/// Render a calendar day as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored date or date-time into a UTC timestamp.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]`
/// (naive, read as UTC) and RFC 3339. Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.to_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(start_of_day(date));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Interpret integer storage as unix seconds.
#[must_use]
pub fn from_unix_seconds(secs: i64) -> Option<Timestamp> {
    DateTime::from_timestamp(secs, 0)
}
