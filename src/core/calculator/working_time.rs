//! Effective working time between two instants.
//!
//! The interval is walked one local calendar day at a time in the user's
//! timezone. Each day contributes the overlap between the interval and that
//! day's work window, unless the day is a weekend (when excluded) or falls in
//! an out-of-office period.

use crate::errors::{AppError, AppResult};
use crate::models::ooo::{OooPeriod, is_out_of_office};
use crate::models::user::WorkSchedule;
use crate::utils::time::{local_date, resolve_local, to_db_timestamp};
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Working hours elapsed in `[start, end]`, always `>= 0` and never more than
/// the wall-clock difference.
pub fn working_duration(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    schedule: &WorkSchedule,
    ooo: &[OooPeriod],
) -> AppResult<f64> {
    if end < start {
        return Err(AppError::InvalidInterval {
            start: to_db_timestamp(&start),
            end: to_db_timestamp(&end),
        });
    }

    if end == start || schedule.is_empty_window() {
        return Ok(0.0);
    }

    let tz = &schedule.timezone;
    let first = local_date(&start, tz);
    let last = local_date(&end, tz);

    let mut total_seconds: i64 = 0;

    for day in first.iter_days().take_while(|d| *d <= last) {
        if schedule.exclude_weekends && is_weekend(day) {
            continue;
        }

        if is_out_of_office(ooo, day) {
            continue;
        }

        let window_start = resolve_local(tz, day, schedule.work_start).with_timezone(&Utc);
        let window_end = resolve_local(tz, day, schedule.work_end).with_timezone(&Utc);

        let from = start.max(window_start);
        let to = end.min(window_end);

        if to > from {
            total_seconds += (to - from).num_seconds();
        }
    }

    Ok(total_seconds as f64 / 3600.0)
}
