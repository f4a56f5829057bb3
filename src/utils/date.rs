use chrono::{Datelike, NaiveDate};

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Resolve a single period token into its first and last day.
///
/// Accepted forms: `YYYY-MM-DD`, `YYYY-MM`, `YYYY`.
pub fn period_bounds(p: &str) -> Result<(NaiveDate, NaiveDate), String> {
    let p = p.trim();

    // YYYY-MM-DD
    if let Some(d) = parse_date(p) {
        return Ok((d, d));
    }

    // YYYY-MM
    if let Ok(first) = NaiveDate::parse_from_str(&format!("{p}-01"), "%Y-%m-%d") {
        return Ok((first, last_day_of_month(first.year(), first.month())?));
    }

    // YYYY
    if p.len() == 4
        && let Ok(year) = p.parse::<i32>()
    {
        let first = NaiveDate::from_ymd_opt(year, 1, 1);
        let last = NaiveDate::from_ymd_opt(year, 12, 31);
        if let (Some(first), Some(last)) = (first, last) {
            return Ok((first, last));
        }
    }

    Err(format!("Invalid period: {}", p))
}

/// Resolve a period expression, either a single token or `start:end`.
pub fn resolve_period(p: &str) -> Result<(NaiveDate, NaiveDate), String> {
    if let Some((start, end)) = p.split_once(':') {
        let (first, _) = period_bounds(start)?;
        let (_, last) = period_bounds(end)?;
        if last < first {
            return Err(format!("Invalid period: {} is after {}", first, last));
        }
        return Ok((first, last));
    }

    period_bounds(p)
}

/// Bounds of the current month, used when no period is given.
pub fn current_month_bounds() -> Result<(NaiveDate, NaiveDate), String> {
    let today = today();
    let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
        .ok_or_else(|| format!("Invalid month: {}", today))?;
    Ok((first, last_day_of_month(today.year(), today.month())?))
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate, String> {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| format!("Invalid month: {year}-{month:02}"))
}
