// src/export/model.rs

use crate::models::daily_stat::DailyStat;
use crate::models::pair::ResponsePair;
use crate::utils::time::to_db_timestamp;
use serde::Serialize;

/// Flat row for pair exports.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PairExport {
    pub user_email: String,
    pub thread_id: String,
    pub external_sender: String,
    pub subject: String,
    pub received_at: String,
    pub replied_at: String,
    pub response_hours: f64,
    pub adjusted_response_hours: f64,
}

impl From<&ResponsePair> for PairExport {
    fn from(p: &ResponsePair) -> Self {
        Self {
            user_email: p.user_email.clone(),
            thread_id: p.thread_id.clone(),
            external_sender: p.external_sender.clone(),
            subject: p.subject.clone(),
            received_at: to_db_timestamp(&p.received_at),
            replied_at: to_db_timestamp(&p.replied_at),
            response_hours: p.response_hours,
            adjusted_response_hours: p.adjusted_response_hours,
        }
    }
}

/// Flat row for daily-stat exports. Empty days leave the hour columns blank.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StatExport {
    pub user_email: String,
    pub date: String,
    pub emails_received: i64,
    pub emails_sent: i64,
    pub response_pairs_count: i64,
    pub avg_response_hours: Option<f64>,
    pub median_response_hours: Option<f64>,
    pub min_response_hours: Option<f64>,
    pub max_response_hours: Option<f64>,
    pub avg_adjusted_hours: Option<f64>,
    pub median_adjusted_hours: Option<f64>,
    pub min_adjusted_hours: Option<f64>,
    pub max_adjusted_hours: Option<f64>,
}

impl From<&DailyStat> for StatExport {
    fn from(s: &DailyStat) -> Self {
        Self {
            user_email: s.user_email.clone(),
            date: s.date.format("%Y-%m-%d").to_string(),
            emails_received: s.emails_received,
            emails_sent: s.emails_sent,
            response_pairs_count: s.response_pairs_count,
            avg_response_hours: s.raw.map(|x| x.avg),
            median_response_hours: s.raw.map(|x| x.median),
            min_response_hours: s.raw.map(|x| x.min),
            max_response_hours: s.raw.map(|x| x.max),
            avg_adjusted_hours: s.adjusted.map(|x| x.avg),
            median_adjusted_hours: s.adjusted.map(|x| x.median),
            min_adjusted_hours: s.adjusted.map(|x| x.min),
            max_adjusted_hours: s.adjusted.map(|x| x.max),
        }
    }
}
