//! Tracked users and out-of-office periods.

use crate::errors::{AppError, AppResult};
use crate::models::ooo::OooPeriod;
use crate::models::user::{TrackedUser, WorkSchedule};
use crate::utils::time::{parse_time, parse_timestamp, parse_timezone, to_db_timestamp};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

const USER_COLUMNS: &str = "id, email, name, domain, team_function, is_active, \
     work_start, work_end, timezone, exclude_weekends, last_synced_at, created_at";

/// Wrap a parse failure of a stored TEXT column into a rusqlite error.
pub(crate) fn bad_column(idx: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

pub(crate) fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| bad_column(idx, AppError::InvalidDate(s)))
}

pub(crate) fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    parse_timestamp(&s).map_err(|e| bad_column(idx, e))
}

pub(crate) fn opt_timestamp_column(
    row: &Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(s) => parse_timestamp(&s).map(Some).map_err(|e| bad_column(idx, e)),
        None => Ok(None),
    }
}

pub fn map_user(row: &Row) -> rusqlite::Result<TrackedUser> {
    let start_str: String = row.get(6)?;
    let end_str: String = row.get(7)?;
    let tz_str: String = row.get(8)?;

    let work_start =
        parse_time(&start_str).ok_or_else(|| bad_column(6, AppError::InvalidTime(start_str)))?;
    let work_end =
        parse_time(&end_str).ok_or_else(|| bad_column(7, AppError::InvalidTime(end_str)))?;
    let timezone = parse_timezone(&tz_str).map_err(|e| bad_column(8, e))?;

    Ok(TrackedUser {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        domain: row.get(3)?,
        team_function: row.get(4)?,
        is_active: row.get::<_, i64>(5)? == 1,
        schedule: WorkSchedule {
            work_start,
            work_end,
            timezone,
            exclude_weekends: row.get::<_, i64>(9)? == 1,
        },
        last_synced_at: opt_timestamp_column(row, 10)?,
        created_at: row.get(11)?,
    })
}

/// Insert a user, or update profile and schedule of an existing one.
/// `created_at` and `last_synced_at` are never overwritten here.
pub fn upsert_user(conn: &Connection, u: &TrackedUser) -> AppResult<()> {
    conn.execute(
        "INSERT INTO tracked_users
            (email, name, domain, team_function, is_active,
             work_start, work_end, timezone, exclude_weekends, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(email) DO UPDATE SET
            name             = excluded.name,
            domain           = excluded.domain,
            team_function    = excluded.team_function,
            is_active        = excluded.is_active,
            work_start       = excluded.work_start,
            work_end         = excluded.work_end,
            timezone         = excluded.timezone,
            exclude_weekends = excluded.exclude_weekends",
        params![
            u.email,
            u.name,
            u.domain,
            u.team_function,
            if u.is_active { 1 } else { 0 },
            u.schedule.work_start.format("%H:%M").to_string(),
            u.schedule.work_end.format("%H:%M").to_string(),
            u.schedule.timezone.name(),
            if u.schedule.exclude_weekends { 1 } else { 0 },
            u.created_at,
        ],
    )?;
    Ok(())
}

pub fn load_user(conn: &Connection, email: &str) -> AppResult<Option<TrackedUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM tracked_users WHERE email = ?1");
    let user = conn
        .query_row(&sql, [email.trim().to_lowercase()], map_user)
        .optional()?;
    Ok(user)
}

pub fn require_user(conn: &Connection, email: &str) -> AppResult<TrackedUser> {
    load_user(conn, email)?.ok_or_else(|| AppError::UnknownUser(email.to_string()))
}

pub fn list_users(conn: &Connection, include_inactive: bool) -> AppResult<Vec<TrackedUser>> {
    let sql = if include_inactive {
        format!("SELECT {USER_COLUMNS} FROM tracked_users ORDER BY email ASC")
    } else {
        format!("SELECT {USER_COLUMNS} FROM tracked_users WHERE is_active = 1 ORDER BY email ASC")
    };

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_user)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn set_active(conn: &Connection, email: &str, active: bool) -> AppResult<()> {
    let n = conn.execute(
        "UPDATE tracked_users SET is_active = ?1 WHERE email = ?2",
        params![if active { 1 } else { 0 }, email.trim().to_lowercase()],
    )?;
    if n == 0 {
        return Err(AppError::UnknownUser(email.to_string()));
    }
    Ok(())
}

pub fn set_last_synced(conn: &Connection, email: &str, at: &DateTime<Utc>) -> AppResult<()> {
    conn.execute(
        "UPDATE tracked_users SET last_synced_at = ?1 WHERE email = ?2",
        params![to_db_timestamp(at), email],
    )?;
    Ok(())
}

/// Distinct domains of all tracked users (active or not).
pub fn user_domains(conn: &Connection) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT domain FROM tracked_users ORDER BY domain")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ---------------------------
// Out of office
// ---------------------------

pub fn upsert_ooo(conn: &Connection, email: &str, p: &OooPeriod) -> AppResult<()> {
    conn.execute(
        "INSERT INTO user_out_of_office (user_email, start_date, end_date, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_email, start_date, end_date) DO UPDATE SET
            description = excluded.description",
        params![
            email,
            p.start_date.format("%Y-%m-%d").to_string(),
            p.end_date.format("%Y-%m-%d").to_string(),
            p.description,
            Local::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn load_ooo(conn: &Connection, email: &str) -> AppResult<Vec<OooPeriod>> {
    let mut stmt = conn.prepare(
        "SELECT start_date, end_date, description
         FROM user_out_of_office
         WHERE user_email = ?1
         ORDER BY start_date ASC",
    )?;

    let rows = stmt.query_map([email], |row| {
        Ok(OooPeriod {
            start_date: date_column(row, 0)?,
            end_date: date_column(row, 1)?,
            description: row.get(2)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn delete_ooo(conn: &Connection, email: &str, start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    let n = conn.execute(
        "DELETE FROM user_out_of_office
         WHERE user_email = ?1 AND start_date = ?2 AND end_date = ?3",
        params![
            email,
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string()
        ],
    )?;

    if n == 0 {
        return Err(AppError::OooNotFound {
            user: email.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}
