//! Time utilities: parsing HH:MM, timezone resolution, DB timestamp format, hour formatting.

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Storage format for instants: UTC, second precision, lexically sortable.
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn parse_time(t: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(t.trim(), "%H:%M").ok()
}

pub fn parse_time_arg(t: &str) -> AppResult<NaiveTime> {
    parse_time(t).ok_or_else(|| AppError::InvalidTime(t.to_string()))
}

pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| AppError::InvalidTimezone(name.to_string()))
}

pub fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored or user-supplied instant.
/// Accepts the DB format as well as any RFC 3339 string with an offset.
pub fn parse_timestamp(s: &str) -> AppResult<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, DB_TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::InvalidTimestamp(s.to_string()))
}

/// Resolve a local date + time in `tz`, handling DST transitions.
///
/// Ambiguous times (fall-back) take the earliest instant; times inside a
/// spring-forward gap take the post-transition instant.
pub fn resolve_local(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);

    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }

    // Spring-forward gap: step forward until the wall clock exists again.
    let mut probe = naive;
    for _ in 0..4 {
        probe += chrono::Duration::minutes(30);
        if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
            log::debug!(
                "DST gap at {} in {}; using {}",
                naive,
                tz.name(),
                dt.to_rfc3339()
            );
            return dt;
        }
    }

    log::warn!(
        "Could not resolve local time {} in {}; falling back to UTC",
        naive,
        tz.name()
    );
    naive.and_utc().with_timezone(tz)
}

/// Start of the local calendar day `date` in `tz`, as a UTC instant.
pub fn local_midnight_utc(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    resolve_local(tz, date, NaiveTime::MIN).with_timezone(&Utc)
}

/// UTC range `[start, end)` covering the local calendar day `date`.
pub fn local_day_bounds_utc(tz: &Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight_utc(tz, date);
    let end = match date.succ_opt() {
        Some(next) => local_midnight_utc(tz, next),
        None => start + chrono::Duration::days(1),
    };
    (start, end)
}

/// Calendar date of `ts` in `tz`.
pub fn local_date(ts: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Hours between two instants, fractional.
pub fn hours_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> f64 {
    (*end - *start).num_seconds() as f64 / 3600.0
}

/// Human-readable duration for a number of hours: `45m`, `3.5h`, `2.1d`.
pub fn format_hours(hours: f64) -> String {
    if hours < 1.0 {
        format!("{:.0}m", hours * 60.0)
    } else if hours < 24.0 {
        format!("{:.1}h", hours)
    } else {
        format!("{:.1}d", hours / 24.0)
    }
}

pub fn format_opt_hours(hours: Option<f64>) -> String {
    hours.map(format_hours).unwrap_or_else(|| "--".to_string())
}
