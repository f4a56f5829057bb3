use crate::errors::{AppError, AppResult};
use crate::ui::messages::success;
use rusqlite::{Connection, OptionalExtension, params};

/// Ensure that the `log` table exists. Migration markers live there.
fn ensure_log_table(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

struct Migration {
    version: &'static str,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20250301_0001_core_schema",
        description: "Created tracked_users, received_emails, response_pairs, daily_stats",
        sql: r#"
        CREATE TABLE IF NOT EXISTS tracked_users (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            email          TEXT NOT NULL UNIQUE,
            name           TEXT NOT NULL DEFAULT '',
            domain         TEXT NOT NULL,
            team_function  TEXT NOT NULL DEFAULT '',
            is_active      INTEGER NOT NULL DEFAULT 1,
            created_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS received_emails (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email      TEXT NOT NULL,
            sender_email    TEXT NOT NULL,
            subject         TEXT NOT NULL DEFAULT '',
            received_at     TEXT NOT NULL,
            thread_id       TEXT NOT NULL,
            replied         INTEGER NOT NULL DEFAULT 0,
            replied_at      TEXT,
            response_hours  REAL,
            created_at      TEXT NOT NULL,
            UNIQUE (thread_id, received_at)
        );

        CREATE TABLE IF NOT EXISTS response_pairs (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email       TEXT NOT NULL,
            external_sender  TEXT NOT NULL,
            subject          TEXT NOT NULL DEFAULT '',
            received_at      TEXT NOT NULL,
            replied_at       TEXT NOT NULL,
            response_hours   REAL NOT NULL,
            thread_id        TEXT NOT NULL,
            created_at       TEXT NOT NULL,
            UNIQUE (thread_id, replied_at),
            CHECK (replied_at > received_at)
        );

        CREATE TABLE IF NOT EXISTS daily_stats (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email             TEXT NOT NULL,
            date                   TEXT NOT NULL,
            emails_received        INTEGER NOT NULL DEFAULT 0,
            emails_sent            INTEGER NOT NULL DEFAULT 0,
            response_pairs_count   INTEGER NOT NULL DEFAULT 0,
            avg_response_hours     REAL,
            median_response_hours  REAL,
            min_response_hours     REAL,
            max_response_hours     REAL,
            updated_at             TEXT NOT NULL,
            UNIQUE (user_email, date)
        );

        CREATE INDEX IF NOT EXISTS idx_pairs_user_replied ON response_pairs(user_email, replied_at);
        CREATE INDEX IF NOT EXISTS idx_received_user ON received_emails(user_email, received_at);
        "#,
    },
    Migration {
        version: "20250315_0002_work_schedule",
        description: "Added working hours to tracked_users and the user_out_of_office table",
        sql: r#"
        ALTER TABLE tracked_users ADD COLUMN work_start TEXT NOT NULL DEFAULT '09:00';
        ALTER TABLE tracked_users ADD COLUMN work_end TEXT NOT NULL DEFAULT '17:00';
        ALTER TABLE tracked_users ADD COLUMN timezone TEXT NOT NULL DEFAULT 'America/New_York';
        ALTER TABLE tracked_users ADD COLUMN exclude_weekends INTEGER NOT NULL DEFAULT 1;

        CREATE TABLE IF NOT EXISTS user_out_of_office (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email   TEXT NOT NULL,
            start_date   TEXT NOT NULL,
            end_date     TEXT NOT NULL,
            description  TEXT,
            created_at   TEXT NOT NULL,
            UNIQUE (user_email, start_date, end_date),
            CHECK (end_date >= start_date)
        );
        "#,
    },
    Migration {
        version: "20250315_0003_adjusted_hours",
        description: "Added adjusted response hours to response_pairs and daily_stats",
        sql: r#"
        ALTER TABLE response_pairs ADD COLUMN adjusted_response_hours REAL;
        ALTER TABLE daily_stats ADD COLUMN avg_adjusted_hours REAL;
        ALTER TABLE daily_stats ADD COLUMN median_adjusted_hours REAL;
        ALTER TABLE daily_stats ADD COLUMN min_adjusted_hours REAL;
        ALTER TABLE daily_stats ADD COLUMN max_adjusted_hours REAL;
        "#,
    },
    Migration {
        version: "20250402_0004_pair_overrides",
        description: "Created excluded_response_pairs and whitelisted_response_pairs",
        sql: r#"
        CREATE TABLE IF NOT EXISTS excluded_response_pairs (
            id                       INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email               TEXT NOT NULL,
            thread_id                TEXT NOT NULL,
            replied_at               TEXT NOT NULL,
            external_sender          TEXT NOT NULL DEFAULT '',
            subject                  TEXT NOT NULL DEFAULT '',
            received_at              TEXT NOT NULL,
            response_hours           REAL NOT NULL,
            adjusted_response_hours  REAL,
            reason                   TEXT NOT NULL DEFAULT '',
            excluded_at              TEXT NOT NULL,
            UNIQUE (thread_id, replied_at)
        );

        CREATE TABLE IF NOT EXISTS whitelisted_response_pairs (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email      TEXT NOT NULL,
            thread_id       TEXT NOT NULL,
            replied_at      TEXT NOT NULL,
            note            TEXT NOT NULL DEFAULT '',
            whitelisted_at  TEXT NOT NULL,
            UNIQUE (thread_id, replied_at)
        );
        "#,
    },
    Migration {
        version: "20250410_0005_sync_state",
        description: "Added last_synced_at to tracked_users",
        sql: r#"
        ALTER TABLE tracked_users ADD COLUMN last_synced_at TEXT;
        "#,
    },
    Migration {
        version: "20250418_0006_body_preview",
        description: "Added body_preview to received_emails",
        sql: r#"
        ALTER TABLE received_emails ADD COLUMN body_preview TEXT;
        "#,
    },
];

fn is_applied(conn: &Connection, version: &str) -> AppResult<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, m: &Migration) -> AppResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(m.sql)
        .map_err(|e| AppError::Migration(format!("{}: {}", m.version, e)))?;

    tx.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        params![m.version, m.description],
    )?;

    tx.commit()?;
    Ok(())
}

/// Names of the migrations not yet applied to this database.
pub fn pending_migrations(conn: &Connection) -> AppResult<Vec<&'static str>> {
    ensure_log_table(conn)?;

    let mut out = Vec::new();
    for m in MIGRATIONS {
        if !is_applied(conn, m.version)? {
            out.push(m.version);
        }
    }
    Ok(out)
}

/// Public entry point: run all pending migrations, in order.
///
/// Invoked by db::init_db(). Returns how many were applied.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<usize> {
    ensure_log_table(conn)?;

    let mut applied = 0;
    for m in MIGRATIONS {
        if is_applied(conn, m.version)? {
            continue;
        }

        apply(conn, m)?;
        log::info!("migration applied: {}", m.version);
        applied += 1;
    }

    if applied > 0 {
        success(format!("Applied {} database migration(s).", applied));
    }

    Ok(applied)
}
