//! Read-side views: stored pairs and daily rollups over a period.

use crate::core::calculator::aggregate::summarize;
use crate::db::pool::DbPool;
use crate::db::{daily_stats, pairs};
use crate::errors::AppResult;
use crate::models::daily_stat::{DailyStat, Summary};
use crate::models::pair::ResponsePair;
use crate::utils::time::local_midnight_utc;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Totals over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub days: usize,
    pub emails_received: i64,
    pub emails_sent: i64,
    pub response_pairs: usize,
    /// Over every pair of the period, not an average of daily averages.
    pub raw: Option<Summary>,
    pub adjusted: Option<Summary>,
}

/// UTC range `[start, end)` for local dates `from..=to` in `tz`.
pub fn period_utc_bounds(tz: &Tz, from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight_utc(tz, from);
    let end = match to.succ_opt() {
        Some(next) => local_midnight_utc(tz, next),
        None => local_midnight_utc(tz, to) + Duration::days(1),
    };
    (start, end)
}

pub fn summarize_period(stats: &[DailyStat], pairs: &[ResponsePair]) -> PeriodSummary {
    let raw: Vec<f64> = pairs.iter().map(|p| p.response_hours).collect();
    let adjusted: Vec<f64> = pairs.iter().map(|p| p.adjusted_response_hours).collect();

    PeriodSummary {
        days: stats.len(),
        emails_received: stats.iter().map(|s| s.emails_received).sum(),
        emails_sent: stats.iter().map(|s| s.emails_sent).sum(),
        response_pairs: pairs.len(),
        raw: summarize(&raw),
        adjusted: summarize(&adjusted),
    }
}

/// One user's totals over a period, as shown in the team ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRollup {
    pub user_email: String,
    pub emails_received: i64,
    pub emails_sent: i64,
    pub response_pairs: usize,
    pub raw: Option<Summary>,
    pub adjusted: Option<Summary>,
}

impl UserRollup {
    /// Average raw hours above (positive) or below the team average.
    pub fn vs_team(&self, team: &TeamOverview) -> Option<f64> {
        Some(self.raw?.avg - team.team_avg?)
    }
}

/// Per-user rollups ranked fastest first, plus team-level figures.
///
/// Team median and average are the means of the per-user values, so a
/// busy mailbox does not drown out the others.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamOverview {
    pub users: Vec<UserRollup>,
    pub team_median: Option<f64>,
    pub team_avg: Option<f64>,
    pub response_pairs: usize,
    pub emails_received: i64,
    pub emails_sent: i64,
}

impl TeamOverview {
    pub fn user(&self, email: &str) -> Option<&UserRollup> {
        self.users.iter().find(|u| u.user_email == email)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Users without a single pair rank last; ties go by email.
fn by_median(a: &UserRollup, b: &UserRollup) -> Ordering {
    match (a.raw, b.raw) {
        (Some(x), Some(y)) => x.median.total_cmp(&y.median),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.user_email.cmp(&b.user_email))
}

pub fn team_overview(stats: &[DailyStat], pairs: &[ResponsePair]) -> TeamOverview {
    let mut stats_by_user: BTreeMap<&str, Vec<DailyStat>> = BTreeMap::new();
    for s in stats {
        stats_by_user.entry(s.user_email.as_str()).or_default().push(s.clone());
    }
    let mut pairs_by_user: BTreeMap<&str, Vec<ResponsePair>> = BTreeMap::new();
    for p in pairs {
        pairs_by_user.entry(p.user_email.as_str()).or_default().push(p.clone());
        stats_by_user.entry(p.user_email.as_str()).or_default();
    }

    let mut users: Vec<UserRollup> = stats_by_user
        .into_iter()
        .map(|(email, days)| {
            let user_pairs = pairs_by_user.remove(email).unwrap_or_default();
            let s = summarize_period(&days, &user_pairs);
            UserRollup {
                user_email: email.to_string(),
                emails_received: s.emails_received,
                emails_sent: s.emails_sent,
                response_pairs: s.response_pairs,
                raw: s.raw,
                adjusted: s.adjusted,
            }
        })
        .collect();
    users.sort_by(by_median);

    let medians: Vec<f64> = users.iter().filter_map(|u| u.raw.map(|r| r.median)).collect();
    let avgs: Vec<f64> = users.iter().filter_map(|u| u.raw.map(|r| r.avg)).collect();

    TeamOverview {
        team_median: mean(&medians),
        team_avg: mean(&avgs),
        response_pairs: users.iter().map(|u| u.response_pairs).sum(),
        emails_received: users.iter().map(|u| u.emails_received).sum(),
        emails_sent: users.iter().map(|u| u.emails_sent).sum(),
        users,
    }
}

pub struct ReportLogic;

impl ReportLogic {
    pub fn pairs(
        pool: &DbPool,
        user: Option<&str>,
        tz: &Tz,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<ResponsePair>> {
        let (start, end) = period_utc_bounds(tz, from, to);
        pairs::load_pairs(&pool.conn, user, &start, &end)
    }

    pub fn stats(
        pool: &DbPool,
        user: Option<&str>,
        tz: &Tz,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<(Vec<DailyStat>, PeriodSummary)> {
        let stats = daily_stats::load_daily_stats(&pool.conn, user, from, to)?;
        let pairs = Self::pairs(pool, user, tz, from, to)?;
        let summary = summarize_period(&stats, &pairs);
        Ok((stats, summary))
    }

    /// Ranking of every user with data in the period.
    pub fn overview(pool: &DbPool, tz: &Tz, from: NaiveDate, to: NaiveDate) -> AppResult<TeamOverview> {
        let stats = daily_stats::load_daily_stats(&pool.conn, None, from, to)?;
        let pairs = Self::pairs(pool, None, tz, from, to)?;
        Ok(team_overview(&stats, &pairs))
    }
}
