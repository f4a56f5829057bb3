#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::{DateTime, Duration, Timelike, Utc};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const USER: &str = "contact@lumiere.education";

pub fn rti() -> Command {
    cargo_bin_cmd!("rreplytracker")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_rreplytracker.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    db_path
}

/// Empty mail directory for one test
pub fn temp_mail_dir(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_rreplytracker_mail", name));
    fs::remove_dir_all(&path).ok();
    fs::create_dir_all(&path).expect("create mail dir");
    path.to_string_lossy().to_string()
}

/// Create a temporary output file path inside tempdir and ensure it's removed
pub fn temp_out(name: &str, ext: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_out.{}", name, ext));
    let p = path.to_string_lossy().to_string();
    fs::remove_file(&p).ok();
    p
}

/// A whole hour a few days back, well inside the default lookback.
pub fn recent_hour(days_ago: i64) -> DateTime<Utc> {
    let t = Utc::now() - Duration::days(days_ago);
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .expect("truncate to hour")
}

pub fn ts(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// `start:end` period covering the last `days` days and tomorrow.
pub fn recent_period(days: i64) -> String {
    let today = Utc::now().date_naive();
    format!(
        "{}:{}",
        today - Duration::days(days),
        today + Duration::days(1)
    )
}

/// Write `<mail_dir>/<user>.json` with one answered thread per entry.
/// Each entry is (thread id, received at, hours until the reply).
pub fn write_mailbox(mail_dir: &str, user: &str, threads: &[(&str, DateTime<Utc>, i64)]) {
    let body: Vec<serde_json::Value> = threads
        .iter()
        .map(|(id, received, hours)| {
            let replied = *received + Duration::hours(*hours);
            serde_json::json!({
                "id": id,
                "messages": [
                    {
                        "from": "Client <client@gmail.com>",
                        "to": user,
                        "date": ts(received),
                        "subject": "Program question"
                    },
                    {
                        "from": user,
                        "to": "client@gmail.com",
                        "date": ts(&replied),
                        "subject": "Re: Program question"
                    }
                ]
            })
        })
        .collect();

    let path = PathBuf::from(mail_dir).join(format!("{}.json", user));
    fs::write(path, serde_json::to_string_pretty(&body).expect("serialize mailbox"))
        .expect("write mailbox");
}

/// Init the DB and track the default user.
pub fn init_with_user(db_path: &str) {
    rti()
        .args(["--db", db_path, "--test", "init"])
        .assert()
        .success();

    rti()
        .args([
            "--db",
            db_path,
            "user",
            "add",
            USER,
            "--tz",
            "UTC",
            "--include-weekends",
        ])
        .assert()
        .success();
}
