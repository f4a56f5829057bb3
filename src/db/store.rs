//! Persistence seam used by the sync pipeline and the override commands.

use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::{daily_stats, overrides, pairs, queries};
use crate::errors::AppResult;
use crate::models::daily_stat::DailyStat;
use crate::models::ooo::OooPeriod;
use crate::models::pair::{PairKey, ReceivedEmail, ResponsePair, ThreadKeys};
use crate::models::user::TrackedUser;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

pub trait ResponseStore {
    fn active_users(&self) -> AppResult<Vec<TrackedUser>>;
    fn user(&self, email: &str) -> AppResult<Option<TrackedUser>>;
    /// Domains of every tracked user.
    fn user_domains(&self) -> AppResult<Vec<String>>;
    fn ooo_periods(&self, email: &str) -> AppResult<Vec<OooPeriod>>;
    fn thread_keys(&self, thread_id: &str) -> AppResult<ThreadKeys>;
    fn excluded_keys(&self, email: &str) -> AppResult<HashSet<PairKey>>;
    fn pairs_between(
        &self,
        email: &str,
        from: &DateTime<Utc>,
        to: &DateTime<Utc>,
    ) -> AppResult<Vec<ResponsePair>>;
    fn daily_stat(&self, email: &str, date: NaiveDate) -> AppResult<Option<DailyStat>>;

    /// Persist one user's batch atomically: all rows or none.
    fn save_reconciled(&mut self, pairs: &[ResponsePair], received: &[ReceivedEmail])
    -> AppResult<()>;
    fn upsert_daily_stat(&mut self, stat: &DailyStat) -> AppResult<()>;
    fn mark_synced(&mut self, email: &str, at: &DateTime<Utc>) -> AppResult<()>;
    fn record(&mut self, operation: &str, target: &str, message: &str) -> AppResult<()>;
}

impl ResponseStore for DbPool {
    fn active_users(&self) -> AppResult<Vec<TrackedUser>> {
        queries::list_users(&self.conn, false)
    }

    fn user(&self, email: &str) -> AppResult<Option<TrackedUser>> {
        queries::load_user(&self.conn, email)
    }

    fn user_domains(&self) -> AppResult<Vec<String>> {
        queries::user_domains(&self.conn)
    }

    fn ooo_periods(&self, email: &str) -> AppResult<Vec<OooPeriod>> {
        queries::load_ooo(&self.conn, email)
    }

    fn thread_keys(&self, thread_id: &str) -> AppResult<ThreadKeys> {
        Ok(ThreadKeys {
            existing: pairs::pair_keys_for_thread(&self.conn, thread_id)?,
            excluded: pairs::excluded_keys_for_thread(&self.conn, thread_id)?,
            whitelisted: pairs::whitelisted_keys_for_thread(&self.conn, thread_id)?,
        })
    }

    fn excluded_keys(&self, email: &str) -> AppResult<HashSet<PairKey>> {
        overrides::excluded_keys_for_user(&self.conn, email)
    }

    fn pairs_between(
        &self,
        email: &str,
        from: &DateTime<Utc>,
        to: &DateTime<Utc>,
    ) -> AppResult<Vec<ResponsePair>> {
        pairs::load_pairs(&self.conn, Some(email), from, to)
    }

    fn daily_stat(&self, email: &str, date: NaiveDate) -> AppResult<Option<DailyStat>> {
        daily_stats::load_daily_stat(&self.conn, email, date)
    }

    fn save_reconciled(
        &mut self,
        new_pairs: &[ResponsePair],
        received: &[ReceivedEmail],
    ) -> AppResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for p in new_pairs {
                pairs::upsert_pair(&tx, p)?;
            }
            for r in received {
                pairs::upsert_received(&tx, r)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn upsert_daily_stat(&mut self, stat: &DailyStat) -> AppResult<()> {
        daily_stats::upsert_daily_stat(&self.conn, stat)
    }

    fn mark_synced(&mut self, email: &str, at: &DateTime<Utc>) -> AppResult<()> {
        queries::set_last_synced(&self.conn, email, at)
    }

    fn record(&mut self, operation: &str, target: &str, message: &str) -> AppResult<()> {
        ttlog(&self.conn, operation, target, message)
    }
}
