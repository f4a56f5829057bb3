use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rreplytracker::db::daily_stats::{load_daily_stat, load_daily_stats, upsert_daily_stat};
use rreplytracker::db::migrate::{pending_migrations, run_pending_migrations};
use rreplytracker::db::overrides::{
    delete_excluded, delete_whitelist, excluded_keys_for_user, find_excluded, insert_excluded,
    list_excluded, list_whitelisted, upsert_whitelist,
};
use rreplytracker::db::pairs::{
    delete_pair, find_pair, load_pairs, load_received, pair_keys_for_thread, upsert_pair,
    upsert_received,
};
use rreplytracker::db::pool::DbPool;
use rreplytracker::db::queries::{
    delete_ooo, list_users, load_ooo, require_user, set_active, set_last_synced, upsert_ooo,
    upsert_user, user_domains,
};
use rreplytracker::errors::AppError;
use rreplytracker::models::daily_stat::{DailyStat, Summary};
use rreplytracker::models::ooo::OooPeriod;
use rreplytracker::models::pair::{ReceivedEmail, ResponsePair};
use rreplytracker::models::user::{TrackedUser, WorkSchedule};
use rusqlite::Connection;
use std::collections::HashSet;

fn user(email: &str) -> TrackedUser {
    TrackedUser::new(
        email,
        WorkSchedule {
            work_start: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            work_end: NaiveTime::from_hms_opt(16, 30, 0).unwrap(),
            timezone: chrono_tz::Europe::Rome,
            exclude_weekends: false,
        },
    )
    .unwrap()
}

#[test]
fn user_upsert_keeps_sync_state() {
    let pool = DbPool::open_in_memory().unwrap();
    let mut u = user("contact@lumiere.education");
    upsert_user(&pool.conn, &u).unwrap();

    let ts = Utc.with_ymd_and_hms(2025, 3, 18, 12, 0, 0).unwrap();
    set_last_synced(&pool.conn, &u.email, &ts).unwrap();

    u.name = "Contact".into();
    upsert_user(&pool.conn, &u).unwrap();

    let loaded = require_user(&pool.conn, "Contact@Lumiere.education").unwrap();
    assert_eq!(loaded.name, "Contact");
    assert_eq!(loaded.last_synced_at, Some(ts));
    assert_eq!(loaded.schedule.timezone, chrono_tz::Europe::Rome);
    assert!(!loaded.schedule.exclude_weekends);
}

#[test]
fn deactivated_users_are_hidden_from_active_list() {
    let pool = DbPool::open_in_memory().unwrap();
    upsert_user(&pool.conn, &user("a@lumiere.education")).unwrap();
    upsert_user(&pool.conn, &user("b@veritasai.com")).unwrap();
    set_active(&pool.conn, "b@veritasai.com", false).unwrap();

    assert_eq!(list_users(&pool.conn, false).unwrap().len(), 1);
    assert_eq!(list_users(&pool.conn, true).unwrap().len(), 2);
    assert_eq!(
        user_domains(&pool.conn).unwrap(),
        vec!["lumiere.education", "veritasai.com"]
    );
    assert!(matches!(
        set_active(&pool.conn, "ghost@lumiere.education", true),
        Err(AppError::UnknownUser(_))
    ));
}

#[test]
fn ooo_periods_round_through_the_table() {
    let pool = DbPool::open_in_memory().unwrap();
    let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
    let p = OooPeriod::new(d("2025-03-18"), d("2025-03-20"), Some("conference".into())).unwrap();

    upsert_ooo(&pool.conn, "a@lumiere.education", &p).unwrap();
    upsert_ooo(&pool.conn, "a@lumiere.education", &p).unwrap();
    assert_eq!(load_ooo(&pool.conn, "a@lumiere.education").unwrap(), vec![p]);

    delete_ooo(&pool.conn, "a@lumiere.education", d("2025-03-18"), d("2025-03-20")).unwrap();
    assert!(load_ooo(&pool.conn, "a@lumiere.education").unwrap().is_empty());
    assert!(matches!(
        delete_ooo(&pool.conn, "a@lumiere.education", d("2025-03-18"), d("2025-03-20")),
        Err(AppError::OooNotFound { .. })
    ));
}

fn ts(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
}

fn received(replied_at: Option<DateTime<Utc>>) -> ReceivedEmail {
    ReceivedEmail {
        user_email: "contact@lumiere.education".into(),
        sender_email: "client@gmail.com".into(),
        subject: "Question".into(),
        received_at: ts(17, 20),
        thread_id: "t-1".into(),
        replied: replied_at.is_some(),
        replied_at,
        response_hours: replied_at.map(|r| (r - ts(17, 20)).num_hours() as f64),
        body_preview: None,
    }
}

#[test]
fn replied_flag_never_regresses() {
    let pool = DbPool::open_in_memory().unwrap();
    upsert_received(&pool.conn, &received(Some(ts(18, 14)))).unwrap();
    upsert_received(&pool.conn, &received(None)).unwrap();

    let rows = load_received(&pool.conn, "t-1").unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].replied);
    assert_eq!(rows[0].replied_at, Some(ts(18, 14)));
    assert_eq!(rows[0].response_hours, Some(18.0));
}

#[test]
fn unreplied_row_is_completed_later() {
    let pool = DbPool::open_in_memory().unwrap();
    upsert_received(&pool.conn, &received(None)).unwrap();
    upsert_received(&pool.conn, &received(Some(ts(18, 14)))).unwrap();

    let rows = load_received(&pool.conn, "t-1").unwrap();
    assert!(rows[0].replied);
    assert_eq!(rows[0].replied_at, Some(ts(18, 14)));
}

#[test]
fn body_preview_survives_a_later_upsert_without_one() {
    let pool = DbPool::open_in_memory().unwrap();
    let mut first = received(None);
    first.body_preview = Some("Hi, is the summer cohort still open?".into());
    upsert_received(&pool.conn, &first).unwrap();
    upsert_received(&pool.conn, &received(Some(ts(18, 14)))).unwrap();

    let rows = load_received(&pool.conn, "t-1").unwrap();
    assert_eq!(
        rows[0].body_preview.as_deref(),
        Some("Hi, is the summer cohort still open?")
    );
}

#[test]
fn pairs_are_unique_per_key_and_filtered_by_window() {
    let pool = DbPool::open_in_memory().unwrap();
    let pair = ResponsePair {
        user_email: "contact@lumiere.education".into(),
        external_sender: "client@gmail.com".into(),
        subject: "Question".into(),
        received_at: ts(17, 20),
        replied_at: ts(18, 14),
        response_hours: 18.0,
        adjusted_response_hours: 2.0,
        thread_id: "t-1".into(),
    };

    upsert_pair(&pool.conn, &pair).unwrap();
    upsert_pair(&pool.conn, &pair).unwrap();

    let all = load_pairs(&pool.conn, None, &ts(1, 0), &ts(31, 0)).unwrap();
    assert_eq!(all, vec![pair.clone()]);
    assert!(
        load_pairs(&pool.conn, Some("other@lumiere.education"), &ts(1, 0), &ts(31, 0))
            .unwrap()
            .is_empty()
    );
    assert!(load_pairs(&pool.conn, None, &ts(18, 15), &ts(31, 0)).unwrap().is_empty());

    assert_eq!(
        pair_keys_for_thread(&pool.conn, "t-1").unwrap(),
        HashSet::from([pair.key()])
    );
    assert_eq!(find_pair(&pool.conn, &pair.key()).unwrap(), Some(pair.clone()));
    assert!(delete_pair(&pool.conn, &pair.key()).unwrap());
    assert!(!delete_pair(&pool.conn, &pair.key()).unwrap());
}

#[test]
fn migrations_are_applied_once() {
    let conn = Connection::open_in_memory().unwrap();
    let pending = pending_migrations(&conn).unwrap();
    assert!(pending.contains(&"20250418_0006_body_preview"));
    assert_eq!(run_pending_migrations(&conn).unwrap(), pending.len());
    assert_eq!(run_pending_migrations(&conn).unwrap(), 0);
    assert!(pending_migrations(&conn).unwrap().is_empty());
}

#[test]
fn final_schema_has_adjusted_columns() {
    let conn = Connection::open_in_memory().unwrap();
    run_pending_migrations(&conn).unwrap();

    let mut stmt = conn.prepare("PRAGMA table_info('daily_stats')").unwrap();
    let cols: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .map(|c| c.unwrap())
        .collect();

    for c in [
        "avg_adjusted_hours",
        "median_adjusted_hours",
        "min_adjusted_hours",
        "max_adjusted_hours",
    ] {
        assert!(cols.iter().any(|x| x == c), "missing {c}");
    }
}

fn pair() -> ResponsePair {
    ResponsePair {
        user_email: "contact@lumiere.education".into(),
        external_sender: "client@gmail.com".into(),
        subject: "Question".into(),
        received_at: Utc.with_ymd_and_hms(2025, 3, 17, 20, 0, 0).unwrap(),
        replied_at: Utc.with_ymd_and_hms(2025, 3, 18, 14, 0, 0).unwrap(),
        response_hours: 18.0,
        adjusted_response_hours: 2.0,
        thread_id: "t-1".into(),
    }
}

#[test]
fn excluded_pair_keeps_its_snapshot() {
    let pool = DbPool::open_in_memory().unwrap();
    let p = pair();
    insert_excluded(&pool.conn, &p, "auto-reply").unwrap();

    let found = find_excluded(&pool.conn, &p.key()).unwrap().unwrap();
    assert_eq!(found.pair, p);
    assert_eq!(found.reason, "auto-reply");

    assert_eq!(list_excluded(&pool.conn, Some("contact@lumiere.education")).unwrap().len(), 1);
    assert!(list_excluded(&pool.conn, Some("x@lumiere.education")).unwrap().is_empty());
    assert!(is_excluded_for_user(&pool, &p));

    assert!(delete_excluded(&pool.conn, &p.key()).unwrap());
    assert!(find_excluded(&pool.conn, &p.key()).unwrap().is_none());
}

fn is_excluded_for_user(pool: &DbPool, p: &ResponsePair) -> bool {
    excluded_keys_for_user(&pool.conn, &p.user_email)
        .unwrap()
        .contains(&p.key())
}

#[test]
fn whitelist_is_idempotent() {
    let pool = DbPool::open_in_memory().unwrap();
    let key = pair().key();

    upsert_whitelist(&pool.conn, "contact@lumiere.education", &key, "slow on purpose").unwrap();
    upsert_whitelist(&pool.conn, "contact@lumiere.education", &key, "vendor escalation").unwrap();

    let all = list_whitelisted(&pool.conn, None).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].note, "vendor escalation");
    assert_eq!(all[0].key, key);

    assert!(delete_whitelist(&pool.conn, &key).unwrap());
    assert!(list_whitelisted(&pool.conn, None).unwrap().is_empty());
}

fn stat(pairs: i64, raw: Option<Summary>) -> DailyStat {
    DailyStat {
        user_email: "contact@lumiere.education".into(),
        date: NaiveDate::from_ymd_opt(2025, 3, 18).unwrap(),
        emails_received: 3,
        emails_sent: 2,
        response_pairs_count: pairs,
        raw,
        adjusted: raw,
    }
}

#[test]
fn upsert_replaces_the_day() {
    let pool = DbPool::open_in_memory().unwrap();
    let s = Summary {
        avg: 10.0,
        median: 10.0,
        min: 2.0,
        max: 18.0,
    };

    upsert_daily_stat(&pool.conn, &stat(2, Some(s))).unwrap();
    upsert_daily_stat(&pool.conn, &stat(0, None)).unwrap();

    let d = NaiveDate::from_ymd_opt(2025, 3, 18).unwrap();
    let loaded = load_daily_stat(&pool.conn, "contact@lumiere.education", d)
        .unwrap()
        .unwrap();
    assert_eq!(loaded, stat(0, None));

    let range = load_daily_stats(&pool.conn, None, d, d).unwrap();
    assert_eq!(range.len(), 1);
    assert!(
        load_daily_stats(&pool.conn, Some("x@lumiere.education"), d, d)
            .unwrap()
            .is_empty()
    );
}
