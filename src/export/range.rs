// src/export/range.rs

use crate::errors::{AppError, AppResult};
use crate::utils::date::resolve_period;
use chrono::NaiveDate;

/// Parse --range. `None` or `all` selects everything.
///
/// Otherwise any period expression:
/// - YYYY
/// - YYYY-MM
/// - YYYY-MM-DD
/// - start:end, each side one of the above
pub(crate) fn parse_range(r: Option<&str>) -> AppResult<Option<(NaiveDate, NaiveDate)>> {
    match r.map(str::trim) {
        None => Ok(None),
        Some(r) if r.is_empty() || r.eq_ignore_ascii_case("all") => Ok(None),
        Some(r) => resolve_period(r).map(Some).map_err(AppError::InvalidDate),
    }
}
