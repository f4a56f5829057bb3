//! Sync orchestration: fetch → reconcile → persist → aggregate, per user.
//!
//! Users are processed one after the other. A failure while fetching or
//! persisting is confined to that user: it is logged, reported in the
//! summary, and the remaining users still run.

use crate::config::Config;
use crate::core::calculator::aggregate::aggregate;
use crate::core::classifier::{NoiseFilter, OrgDomains};
use crate::core::reconciler::{DropCounts, ReconcileContext, reconcile};
use crate::db::store::ResponseStore;
use crate::errors::{AppError, AppResult};
use crate::mail::MailSource;
use crate::models::daily_stat::{DailyStat, DayCounts};
use crate::models::message::MailThread;
use crate::models::pair::{PairKey, ReceivedEmail, ResponsePair};
use crate::models::user::TrackedUser;
use crate::utils::time::{local_date, local_day_bounds_utc, local_midnight_utc};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, mpsc};
use std::thread;

#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// Only this user (must be tracked); all active users otherwise.
    pub user: Option<String>,
    /// Ignore `last_synced_at` and re-read the whole lookback window.
    pub backfill: bool,
    pub lookback_days: Option<i64>,
    /// Reconcile and report without writing anything.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub internal_domains: Vec<String>,
    pub noise_filters: Vec<String>,
    pub max_gap: Duration,
    pub backfill_days: i64,
    pub fetch_timeout: std::time::Duration,
    pub now: DateTime<Utc>,
}

impl SyncSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            internal_domains: cfg.internal_domains.clone(),
            noise_filters: cfg.noise_filters.clone(),
            max_gap: Duration::days(cfg.max_response_gap_days),
            backfill_days: cfg.backfill_days,
            fetch_timeout: cfg.fetch_timeout(),
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSyncStats {
    pub window_start: Option<NaiveDate>,
    pub threads: usize,
    pub new_pairs: usize,
    pub received_recorded: usize,
    pub unanswered: usize,
    pub days_updated: usize,
    pub malformed_senders: usize,
    pub dropped: DropCounts,
}

#[derive(Debug)]
pub struct UserSyncResult {
    pub email: String,
    pub outcome: Result<UserSyncStats, AppError>,
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub dry_run: bool,
    pub results: Vec<UserSyncResult>,
}

impl SyncSummary {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_err()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.results.len() - self.failed()
    }

    pub fn total_new_pairs(&self) -> usize {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().ok())
            .map(|s| s.new_pairs)
            .sum()
    }
}

/// Run one fetch on a helper thread, giving up after `timeout`.
///
/// On timeout the helper is left to finish in the background; its result is
/// discarded.
pub fn fetch_with_timeout(
    source: Arc<dyn MailSource>,
    user_email: &str,
    since: DateTime<Utc>,
    timeout: std::time::Duration,
) -> AppResult<Vec<MailThread>> {
    let fail = |reason: String| AppError::FetchFailure {
        user: user_email.to_string(),
        reason,
    };

    let (tx, rx) = mpsc::channel();
    let email = user_email.to_string();

    thread::Builder::new()
        .name(format!("fetch-{}", user_email))
        .spawn(move || {
            let _ = tx.send(source.fetch_threads(&email, since));
        })
        .map_err(|e| fail(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(threads)) => Ok(threads),
        Ok(Err(e @ AppError::FetchFailure { .. })) => Err(e),
        Ok(Err(e)) => Err(fail(e.to_string())),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(fail(format!("timed out after {}s", timeout.as_secs())))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(fail("fetch worker stopped without a result".into()))
        }
    }
}

/// Recompute the stored rollup of one day from the stored pairs.
///
/// `counts` replaces the message counts; `None` keeps the stored ones.
/// Excluded keys are filtered out again even if a pair row still exists.
pub fn refresh_daily_stat(
    store: &mut dyn ResponseStore,
    user: &TrackedUser,
    date: NaiveDate,
    counts: Option<DayCounts>,
    excluded: &HashSet<PairKey>,
) -> AppResult<DailyStat> {
    let tz = &user.schedule.timezone;
    let (from, to) = local_day_bounds_utc(tz, date);

    let pairs: Vec<ResponsePair> = store
        .pairs_between(&user.email, &from, &to)?
        .into_iter()
        .filter(|p| !excluded.contains(&p.key()))
        .collect();

    let counts = match counts {
        Some(c) => c,
        None => store
            .daily_stat(&user.email, date)?
            .map(|s| DayCounts {
                received: s.emails_received,
                sent: s.emails_sent,
            })
            .unwrap_or_default(),
    };

    let stat = aggregate(&user.email, date, &pairs, counts);
    store.upsert_daily_stat(&stat)?;
    Ok(stat)
}

/// Sync every active user (or the requested one).
///
/// Returns `Err` only when the run cannot start; per-user failures are
/// carried in the summary.
pub fn run_sync(
    request: &SyncRequest,
    source: Arc<dyn MailSource>,
    store: &mut dyn ResponseStore,
    settings: &SyncSettings,
) -> AppResult<SyncSummary> {
    let users = match &request.user {
        Some(email) => {
            let user = store
                .user(email)?
                .ok_or_else(|| AppError::UnknownUser(email.clone()))?;
            vec![user]
        }
        None => store.active_users()?,
    };

    let domains = OrgDomains::new(
        settings
            .internal_domains
            .iter()
            .cloned()
            .chain(store.user_domains()?),
    );
    let noise = NoiseFilter::new(&settings.noise_filters);
    log::debug!(
        "org domains: {}",
        domains.iter().collect::<Vec<_>>().join(", ")
    );

    log::info!(
        "sync: {} user(s), {} org domain(s), backfill={}, dry_run={}",
        users.len(),
        domains.len(),
        request.backfill,
        request.dry_run
    );

    let mut summary = SyncSummary {
        dry_run: request.dry_run,
        results: Vec::with_capacity(users.len()),
    };

    for user in users {
        let outcome = sync_user(&user, request, source.clone(), store, settings, &domains, &noise);

        match &outcome {
            Ok(s) => {
                log::info!(
                    "{}: {} thread(s), {} new pair(s), {} day(s) updated",
                    user.email,
                    s.threads,
                    s.new_pairs,
                    s.days_updated
                );
                if !request.dry_run {
                    let msg = format!(
                        "{} new pairs, {} received, {} days updated",
                        s.new_pairs, s.received_recorded, s.days_updated
                    );
                    if let Err(e) = store.record("sync", &user.email, &msg) {
                        log::warn!("failed to write sync log row: {}", e);
                    }
                }
            }
            Err(e) => {
                log::error!("sync failed for {}: {}", user.email, e);
                if !request.dry_run
                    && let Err(le) = store.record("sync_failed", &user.email, &e.to_string())
                {
                    log::warn!("failed to write sync log row: {}", le);
                }
            }
        }

        summary.results.push(UserSyncResult {
            email: user.email.clone(),
            outcome,
        });
    }

    Ok(summary)
}

/// Longest lookback a sync accepts, in days.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// First local date whose mail this run reads.
fn window_start(user: &TrackedUser, request: &SyncRequest, settings: &SyncSettings) -> NaiveDate {
    let tz = &user.schedule.timezone;
    let lookback = request
        .lookback_days
        .unwrap_or(settings.backfill_days)
        .clamp(0, MAX_LOOKBACK_DAYS);

    match user.last_synced_at {
        Some(last) if !request.backfill => local_date(&last, tz),
        _ => {
            let start = Duration::try_days(lookback)
                .and_then(|d| settings.now.checked_sub_signed(d))
                .unwrap_or(settings.now);
            local_date(&start, tz)
        }
    }
}

fn sync_user(
    user: &TrackedUser,
    request: &SyncRequest,
    source: Arc<dyn MailSource>,
    store: &mut dyn ResponseStore,
    settings: &SyncSettings,
    domains: &OrgDomains,
    noise: &NoiseFilter,
) -> AppResult<UserSyncStats> {
    let persist_err = |e: AppError| AppError::PersistFailure {
        user: user.email.clone(),
        reason: e.to_string(),
    };

    let tz = &user.schedule.timezone;
    let today = local_date(&settings.now, tz);
    let start_date = window_start(user, request, settings);
    let since = local_midnight_utc(tz, start_date);

    let ooo = store.ooo_periods(&user.email).map_err(persist_err)?;
    let threads = fetch_with_timeout(source, &user.email, since, settings.fetch_timeout)?;

    let mut stats = UserSyncStats {
        window_start: Some(start_date),
        threads: threads.len(),
        ..Default::default()
    };

    let mut new_pairs: Vec<ResponsePair> = Vec::new();
    let mut received: Vec<ReceivedEmail> = Vec::new();
    let mut counts: BTreeMap<NaiveDate, DayCounts> = BTreeMap::new();
    let mut created: HashSet<PairKey> = HashSet::new();

    for thread in &threads {
        let mut keys = store.thread_keys(&thread.id).map_err(persist_err)?;
        // A thread id delivered twice must not yield the same pair twice.
        keys.existing
            .extend(created.iter().filter(|k| k.thread_id == thread.id).cloned());

        let ctx = ReconcileContext {
            user_email: &user.email,
            schedule: &user.schedule,
            ooo: &ooo,
            domains,
            noise,
            keys: &keys,
            max_gap: settings.max_gap,
        };
        let out = reconcile(thread, &ctx);

        for (day, n) in out.received_per_day {
            if day >= start_date && day <= today {
                counts.entry(day).or_default().received += n;
            }
        }
        for (day, n) in out.sent_per_day {
            if day >= start_date && day <= today {
                counts.entry(day).or_default().sent += n;
            }
        }

        stats.malformed_senders += out.malformed_senders;
        stats.dropped.existing += out.dropped.existing;
        stats.dropped.excluded += out.dropped.excluded;
        stats.dropped.too_old += out.dropped.too_old;
        stats.dropped.invalid_interval += out.dropped.invalid_interval;
        stats.unanswered += out.unmatched_received.len();

        created.extend(out.new_pairs.iter().map(ResponsePair::key));
        new_pairs.extend(out.new_pairs);
        received.extend(out.answered_received);
        received.extend(out.unmatched_received);
    }

    stats.new_pairs = new_pairs.len();
    stats.received_recorded = received.len();

    // Days inside the window get fresh counts; older days that gained a
    // pair keep their stored counts.
    let mut affected: BTreeSet<NaiveDate> = counts.keys().copied().collect();
    let older: BTreeSet<NaiveDate> = new_pairs
        .iter()
        .map(|p| local_date(&p.replied_at, tz))
        .filter(|d| *d < start_date)
        .collect();
    affected.extend(older.iter().copied());
    stats.days_updated = affected.len();

    if request.dry_run {
        return Ok(stats);
    }

    store
        .save_reconciled(&new_pairs, &received)
        .map_err(persist_err)?;

    let excluded = store.excluded_keys(&user.email).map_err(persist_err)?;
    for date in &affected {
        let day_counts = if older.contains(date) {
            None
        } else {
            Some(counts.get(date).copied().unwrap_or_default())
        };
        refresh_daily_stat(store, user, *date, day_counts, &excluded).map_err(persist_err)?;
    }

    store
        .mark_synced(&user.email, &settings.now)
        .map_err(persist_err)?;

    Ok(stats)
}
