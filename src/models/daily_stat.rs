use chrono::NaiveDate;
use serde::Serialize;

/// avg / median / min / max over a set of hour values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub avg: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Message counts for one local day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounts {
    pub received: i64,
    pub sent: i64,
}

/// Daily rollup for one user. ⇔ `daily_stats`, unique on (user_email, date).
#[derive(Debug, Clone, PartialEq)]
pub struct DailyStat {
    pub user_email: String,
    pub date: NaiveDate,
    pub emails_received: i64,
    pub emails_sent: i64,
    pub response_pairs_count: i64,
    pub raw: Option<Summary>,
    pub adjusted: Option<Summary>,
}
