use crate::core::sync::refresh_daily_stat;
use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::store::ResponseStore;
use crate::db::{overrides, pairs, queries};
use crate::errors::{AppError, AppResult};
use crate::models::daily_stat::DailyStat;
use crate::models::pair::{PairKey, ResponsePair};
use crate::utils::time::{local_date, to_db_timestamp};

/// Manual corrections to the reconciled data: exclusions and whitelist entries.
pub struct OverrideLogic;

fn not_found(key: &PairKey) -> AppError {
    AppError::PairNotFound {
        thread_id: key.thread_id.clone(),
        replied_at: to_db_timestamp(&key.replied_at),
    }
}

/// Rebuild the rollup of the day the pair's reply falls on, keeping the
/// stored message counts.
fn recompute_day(pool: &mut DbPool, pair: &ResponsePair) -> AppResult<DailyStat> {
    let user = queries::require_user(&pool.conn, &pair.user_email)?;
    let date = local_date(&pair.replied_at, &user.schedule.timezone);
    let excluded = pool.excluded_keys(&user.email)?;
    refresh_daily_stat(pool, &user, date, None, &excluded)
}

impl OverrideLogic {
    /// Move a stored pair into `excluded_response_pairs`; later syncs will
    /// not recreate it.
    pub fn exclude(pool: &mut DbPool, key: &PairKey, reason: &str) -> AppResult<DailyStat> {
        let pair = pool.with_conn(|conn| {
            let tx = conn.transaction()?;
            let pair = pairs::find_pair(&tx, key)?.ok_or_else(|| not_found(key))?;
            overrides::insert_excluded(&tx, &pair, reason)?;
            pairs::delete_pair(&tx, key)?;
            tx.commit()?;
            Ok(pair)
        })?;

        let stat = recompute_day(pool, &pair)?;
        ttlog(&pool.conn, "exclude", &key.to_string(), reason)?;
        Ok(stat)
    }

    /// Undo an exclusion: the snapshot goes back into `response_pairs`.
    pub fn restore(pool: &mut DbPool, key: &PairKey) -> AppResult<DailyStat> {
        let pair = pool.with_conn(|conn| {
            let tx = conn.transaction()?;
            let ex = overrides::find_excluded(&tx, key)?.ok_or_else(|| not_found(key))?;
            pairs::upsert_pair(&tx, &ex.pair)?;
            overrides::delete_excluded(&tx, key)?;
            tx.commit()?;
            Ok(ex.pair)
        })?;

        let stat = recompute_day(pool, &pair)?;
        ttlog(&pool.conn, "restore", &key.to_string(), "pair restored")?;
        Ok(stat)
    }

    /// Let a pair through the response-gap filter on the next sync.
    pub fn whitelist(pool: &mut DbPool, user_email: &str, key: &PairKey, note: &str) -> AppResult<()> {
        let user = queries::require_user(&pool.conn, user_email)?;
        overrides::upsert_whitelist(&pool.conn, &user.email, key, note)?;
        ttlog(&pool.conn, "whitelist", &key.to_string(), note)?;
        Ok(())
    }

    pub fn remove_whitelist(pool: &mut DbPool, key: &PairKey) -> AppResult<()> {
        if !overrides::delete_whitelist(&pool.conn, key)? {
            return Err(not_found(key));
        }
        ttlog(&pool.conn, "unwhitelist", &key.to_string(), "whitelist entry removed")?;
        Ok(())
    }
}
