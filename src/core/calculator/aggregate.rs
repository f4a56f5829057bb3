//! Daily rollups of response pairs.

use crate::models::daily_stat::{DailyStat, DayCounts, Summary};
use crate::models::pair::ResponsePair;
use chrono::NaiveDate;

/// avg / median / min / max, or `None` for an empty set.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    Some(Summary {
        avg: sorted.iter().sum::<f64>() / n as f64,
        median,
        min: sorted[0],
        max: sorted[n - 1],
    })
}

/// Roll up one user's pairs for one day. The result replaces any stored
/// row for (user, date).
pub fn aggregate(
    user_email: &str,
    date: NaiveDate,
    pairs: &[ResponsePair],
    counts: DayCounts,
) -> DailyStat {
    let raw: Vec<f64> = pairs.iter().map(|p| p.response_hours).collect();
    let adjusted: Vec<f64> = pairs.iter().map(|p| p.adjusted_response_hours).collect();

    DailyStat {
        user_email: user_email.to_string(),
        date,
        emails_received: counts.received,
        emails_sent: counts.sent,
        response_pairs_count: pairs.len() as i64,
        raw: summarize(&raw),
        adjusted: summarize(&adjusted),
    }
}
