use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rreplytracker::core::overrides::OverrideLogic;
use rreplytracker::core::sync::{
    MAX_LOOKBACK_DAYS, SyncRequest, SyncSettings, fetch_with_timeout, run_sync,
};
use rreplytracker::db::pool::DbPool;
use rreplytracker::db::{daily_stats, overrides, pairs, queries};
use rreplytracker::errors::{AppError, AppResult};
use rreplytracker::mail::MailSource;
use rreplytracker::models::message::{MailMessage, MailThread};
use rreplytracker::models::pair::{PairKey, ResponsePair};
use rreplytracker::models::user::{TrackedUser, WorkSchedule};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;

const USER: &str = "contact@lumiere.education";

/// In-memory mailbox keyed by user; optional per-user failure or delay.
#[derive(Default)]
struct FakeSource {
    threads: HashMap<String, Vec<MailThread>>,
    failing: HashSet<String>,
    slow: Option<std::time::Duration>,
    calls: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl MailSource for FakeSource {
    fn fetch_threads(&self, user_email: &str, since: DateTime<Utc>) -> AppResult<Vec<MailThread>> {
        self.calls
            .lock()
            .unwrap()
            .push((user_email.to_string(), since));
        if let Some(d) = self.slow {
            thread::sleep(d);
        }
        if self.failing.contains(user_email) {
            return Err(AppError::Other("provider unavailable".into()));
        }
        Ok(self
            .threads
            .get(user_email)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|t| t.last_activity().is_some_and(|ts| ts >= since))
            .collect())
    }
}

fn utc(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
}

fn msg(from: &str, to: &str, at: DateTime<Utc>, thread: &str) -> MailMessage {
    MailMessage {
        sender: from.into(),
        recipients: vec![to.into()],
        timestamp: at,
        thread_id: thread.into(),
        subject: "Program question".into(),
        body_preview: None,
    }
}

/// Client writes Mon 16:00 EDT, user answers Tue 10:00 EDT.
fn answered_thread(id: &str) -> MailThread {
    MailThread {
        id: id.into(),
        subject: "Program question".into(),
        messages: vec![
            msg("client@gmail.com", USER, utc(17, 20), id),
            msg(USER, "client@gmail.com", utc(18, 14), id),
        ],
    }
}

fn tracked(pool: &DbPool, email: &str) {
    let schedule = WorkSchedule {
        work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        work_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        timezone: chrono_tz::America::New_York,
        exclude_weekends: true,
    };
    queries::upsert_user(&pool.conn, &TrackedUser::new(email, schedule).unwrap()).unwrap();
}

fn settings() -> SyncSettings {
    SyncSettings {
        internal_domains: vec!["lumiere.education".into()],
        noise_filters: vec!["noreply".into()],
        max_gap: Duration::days(7),
        backfill_days: 30,
        fetch_timeout: std::time::Duration::from_secs(5),
        now: utc(19, 12),
    }
}

fn backfill() -> SyncRequest {
    SyncRequest {
        backfill: true,
        ..Default::default()
    }
}

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 18).unwrap()
}

#[test]
fn sync_persists_pairs_and_daily_stats() {
    let mut pool = DbPool::open_in_memory().unwrap();
    tracked(&pool, USER);

    let mut source = FakeSource::default();
    source.threads.insert(USER.into(), vec![answered_thread("t-1")]);

    let summary =
        run_sync(&SyncRequest::default(), Arc::new(source), &mut pool, &settings()).unwrap();
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.total_new_pairs(), 1);

    let stored = pairs::load_pairs(&pool.conn, Some(USER), &utc(1, 0), &utc(31, 0)).unwrap();
    assert_eq!(stored.len(), 1);
    assert!((stored[0].response_hours - 18.0).abs() < 1e-9);
    assert!((stored[0].adjusted_response_hours - 2.0).abs() < 1e-9);

    let day = daily_stats::load_daily_stat(&pool.conn, USER, tuesday())
        .unwrap()
        .unwrap();
    assert_eq!(day.response_pairs_count, 1);
    assert_eq!(day.emails_sent, 1);
    assert_eq!(day.adjusted.unwrap().avg, 2.0);

    let monday = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
    let mon = daily_stats::load_daily_stat(&pool.conn, USER, monday)
        .unwrap()
        .unwrap();
    assert_eq!(mon.emails_received, 1);
    assert_eq!(mon.response_pairs_count, 0);

    let user = queries::require_user(&pool.conn, USER).unwrap();
    assert_eq!(user.last_synced_at, Some(utc(19, 12)));
}

#[test]
fn second_run_creates_no_duplicates() {
    let mut pool = DbPool::open_in_memory().unwrap();
    tracked(&pool, USER);

    let mut source = FakeSource::default();
    source.threads.insert(USER.into(), vec![answered_thread("t-1")]);
    let source: Arc<dyn MailSource> = Arc::new(source);

    run_sync(&backfill(), source.clone(), &mut pool, &settings()).unwrap();
    let again = run_sync(&backfill(), source, &mut pool, &settings()).unwrap();

    let stats = again.results[0].outcome.as_ref().unwrap();
    assert_eq!(stats.new_pairs, 0);
    assert_eq!(stats.dropped.existing, 1);

    let day = daily_stats::load_daily_stat(&pool.conn, USER, tuesday())
        .unwrap()
        .unwrap();
    assert_eq!(day.response_pairs_count, 1);
    assert_eq!(day.emails_sent, 1);
}

#[test]
fn fractional_second_timestamps_keep_reruns_idempotent() {
    let mut pool = DbPool::open_in_memory().unwrap();
    tracked(&pool, USER);

    let half = Duration::milliseconds(500);
    let thread = MailThread {
        id: "t-1".into(),
        subject: "Program question".into(),
        messages: vec![
            msg("client@gmail.com", USER, utc(17, 20) + Duration::milliseconds(250), "t-1"),
            msg(USER, "client@gmail.com", utc(18, 14) + half, "t-1"),
        ],
    };
    let mut source = FakeSource::default();
    source.threads.insert(USER.into(), vec![thread]);
    let source: Arc<dyn MailSource> = Arc::new(source);

    let first = run_sync(&backfill(), source.clone(), &mut pool, &settings()).unwrap();
    assert_eq!(first.total_new_pairs(), 1);

    let stored = pairs::load_pairs(&pool.conn, Some(USER), &utc(1, 0), &utc(31, 0)).unwrap();
    assert_eq!(stored[0].replied_at, utc(18, 14));
    assert_eq!(stored[0].received_at, utc(17, 20));

    let again = run_sync(&backfill(), source.clone(), &mut pool, &settings()).unwrap();
    let stats = again.results[0].outcome.as_ref().unwrap();
    assert_eq!(stats.new_pairs, 0);
    assert_eq!(stats.dropped.existing, 1);

    OverrideLogic::exclude(&mut pool, &PairKey::new("t-1", utc(18, 14)), "auto-reply").unwrap();

    let after = run_sync(&backfill(), source, &mut pool, &settings()).unwrap();
    let stats = after.results[0].outcome.as_ref().unwrap();
    assert_eq!(stats.new_pairs, 0);
    assert_eq!(stats.dropped.excluded, 1);
    assert!(
        pairs::load_pairs(&pool.conn, None, &utc(1, 0), &utc(31, 0))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn pair_key_drops_subseconds() {
    let key = PairKey::new("t-1", utc(18, 14) + Duration::milliseconds(999));
    assert_eq!(key, PairKey::new("t-1", utc(18, 14)));
}

#[test]
fn one_failing_user_does_not_stop_the_others() {
    let mut pool = DbPool::open_in_memory().unwrap();
    tracked(&pool, USER);
    tracked(&pool, "admissions@lumiere.education");

    let mut source = FakeSource::default();
    source.threads.insert(USER.into(), vec![answered_thread("t-1")]);
    source.failing.insert("admissions@lumiere.education".into());

    let summary =
        run_sync(&SyncRequest::default(), Arc::new(source), &mut pool, &settings()).unwrap();
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.succeeded(), 1);

    let failed = summary
        .results
        .iter()
        .find(|r| r.email == "admissions@lumiere.education")
        .unwrap();
    assert!(matches!(failed.outcome, Err(AppError::FetchFailure { .. })));

    let failed_user = queries::require_user(&pool.conn, "admissions@lumiere.education").unwrap();
    assert!(failed_user.last_synced_at.is_none());
    assert_eq!(
        pairs::load_pairs(&pool.conn, Some(USER), &utc(1, 0), &utc(31, 0))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn slow_fetch_times_out() {
    let source = FakeSource {
        slow: Some(std::time::Duration::from_millis(500)),
        ..Default::default()
    };
    let res = fetch_with_timeout(
        Arc::new(source),
        USER,
        utc(1, 0),
        std::time::Duration::from_millis(20),
    );
    match res {
        Err(AppError::FetchFailure { reason, .. }) => assert!(reason.contains("timed out")),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn dry_run_writes_nothing() {
    let mut pool = DbPool::open_in_memory().unwrap();
    tracked(&pool, USER);

    let mut source = FakeSource::default();
    source.threads.insert(USER.into(), vec![answered_thread("t-1")]);

    let req = SyncRequest {
        dry_run: true,
        ..Default::default()
    };
    let summary = run_sync(&req, Arc::new(source), &mut pool, &settings()).unwrap();
    assert_eq!(summary.total_new_pairs(), 1);

    assert!(
        pairs::load_pairs(&pool.conn, None, &utc(1, 0), &utc(31, 0))
            .unwrap()
            .is_empty()
    );
    assert!(
        queries::require_user(&pool.conn, USER)
            .unwrap()
            .last_synced_at
            .is_none()
    );
}

#[test]
fn incremental_window_starts_at_last_sync_midnight() {
    let mut pool = DbPool::open_in_memory().unwrap();
    tracked(&pool, USER);
    // 2025-03-18 03:00 UTC is still 2025-03-17 in New York.
    queries::set_last_synced(&pool.conn, USER, &utc(18, 3)).unwrap();

    let source = Arc::new(FakeSource::default());
    run_sync(&SyncRequest::default(), source.clone(), &mut pool, &settings()).unwrap();

    let calls = source.calls.lock().unwrap();
    // Midnight EDT on 2025-03-17 = 04:00 UTC.
    assert_eq!(calls[0].1, utc(17, 4));
}

#[test]
fn oversized_lookback_is_capped() {
    let mut pool = DbPool::open_in_memory().unwrap();
    tracked(&pool, USER);

    let source = Arc::new(FakeSource::default());
    let req = SyncRequest {
        backfill: true,
        lookback_days: Some(i64::MAX),
        ..Default::default()
    };
    let summary = run_sync(&req, source.clone(), &mut pool, &settings()).unwrap();
    assert_eq!(summary.failed(), 0);

    let calls = source.calls.lock().unwrap();
    let capped = utc(19, 12) - Duration::days(MAX_LOOKBACK_DAYS);
    assert_eq!(calls[0].1.year(), capped.year());
    assert!(calls[0].1 <= capped);
}

#[test]
fn excluded_pair_is_not_recreated() {
    let mut pool = DbPool::open_in_memory().unwrap();
    tracked(&pool, USER);

    let pair_key = PairKey::new("t-1", utc(18, 14));
    let snapshot = ResponsePair {
        user_email: USER.into(),
        external_sender: "client@gmail.com".into(),
        subject: "Program question".into(),
        received_at: utc(17, 20),
        replied_at: pair_key.replied_at,
        response_hours: 18.0,
        adjusted_response_hours: 2.0,
        thread_id: "t-1".into(),
    };
    overrides::insert_excluded(&pool.conn, &snapshot, "auto-reply").unwrap();

    let mut source = FakeSource::default();
    source.threads.insert(USER.into(), vec![answered_thread("t-1")]);

    let summary =
        run_sync(&SyncRequest::default(), Arc::new(source), &mut pool, &settings()).unwrap();
    let stats = summary.results[0].outcome.as_ref().unwrap();
    assert_eq!(stats.new_pairs, 0);
    assert_eq!(stats.dropped.excluded, 1);

    let day = daily_stats::load_daily_stat(&pool.conn, USER, tuesday())
        .unwrap()
        .unwrap();
    assert_eq!(day.response_pairs_count, 0);
    assert!(day.raw.is_none());
}

#[test]
fn unknown_requested_user_is_rejected() {
    let mut pool = DbPool::open_in_memory().unwrap();
    let req = SyncRequest {
        user: Some("ghost@lumiere.education".into()),
        ..Default::default()
    };
    assert!(matches!(
        run_sync(&req, Arc::new(FakeSource::default()), &mut pool, &settings()),
        Err(AppError::UnknownUser(_))
    ));
}
