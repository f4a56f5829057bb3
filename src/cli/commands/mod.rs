pub mod config;
pub mod db;
pub mod export;
pub mod init;
pub mod log;
pub mod ooo;
pub mod overrides;
pub mod pairs;
pub mod stats;
pub mod sync;
pub mod user;

use crate::config::Config;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::models::pair::PairKey;
use crate::utils::date::{current_month_bounds, resolve_period};
use crate::utils::time::parse_timestamp;
use chrono::NaiveDate;

/// Open the configured database, applying pending migrations.
pub(crate) fn open_pool(cfg: &Config) -> AppResult<DbPool> {
    DbPool::open(&cfg.database, cfg.store_timeout())
}

/// `--period`, or the current month when absent.
pub(crate) fn period_or_current_month(period: &Option<String>) -> AppResult<(NaiveDate, NaiveDate)> {
    match period {
        Some(p) => resolve_period(p),
        None => current_month_bounds(),
    }
    .map_err(AppError::InvalidDate)
}

pub(crate) fn pair_key(thread_id: &str, replied_at: &str) -> AppResult<PairKey> {
    Ok(PairKey::new(thread_id.trim(), parse_timestamp(replied_at)?))
}
