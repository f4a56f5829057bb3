//! Response pairs and received emails.

use crate::db::queries::{opt_timestamp_column, timestamp_column};
use crate::errors::AppResult;
use crate::models::pair::{PairKey, ReceivedEmail, ResponsePair};
use crate::utils::time::to_db_timestamp;
use chrono::{DateTime, Local, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashSet;

const PAIR_COLUMNS: &str = "user_email, external_sender, subject, received_at, replied_at, \
     response_hours, adjusted_response_hours, thread_id";

pub fn map_pair(row: &Row) -> rusqlite::Result<ResponsePair> {
    let response_hours: f64 = row.get(5)?;
    Ok(ResponsePair {
        user_email: row.get(0)?,
        external_sender: row.get(1)?,
        subject: row.get(2)?,
        received_at: timestamp_column(row, 3)?,
        replied_at: timestamp_column(row, 4)?,
        response_hours,
        // Rows written before adjusted hours existed fall back to the raw value.
        adjusted_response_hours: row.get::<_, Option<f64>>(6)?.unwrap_or(response_hours),
        thread_id: row.get(7)?,
    })
}

pub fn upsert_pair(conn: &Connection, p: &ResponsePair) -> AppResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO response_pairs
            (user_email, external_sender, subject, received_at, replied_at,
             response_hours, adjusted_response_hours, thread_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(thread_id, replied_at) DO UPDATE SET
            external_sender         = excluded.external_sender,
            subject                 = excluded.subject,
            received_at             = excluded.received_at,
            response_hours          = excluded.response_hours,
            adjusted_response_hours = excluded.adjusted_response_hours",
    )?;

    stmt.execute(params![
        p.user_email,
        p.external_sender,
        p.subject,
        to_db_timestamp(&p.received_at),
        to_db_timestamp(&p.replied_at),
        p.response_hours,
        p.adjusted_response_hours,
        p.thread_id,
        Local::now().to_rfc3339(),
    ])?;
    Ok(())
}

/// Insert a received email, or merge into the existing row.
/// A row already marked replied keeps its reply data.
pub fn upsert_received(conn: &Connection, r: &ReceivedEmail) -> AppResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO received_emails
            (user_email, sender_email, subject, received_at, thread_id,
             replied, replied_at, response_hours, created_at, body_preview)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(thread_id, received_at) DO UPDATE SET
            body_preview = COALESCE(excluded.body_preview, received_emails.body_preview),
            replied_at = CASE WHEN received_emails.replied = 1
                              THEN received_emails.replied_at
                              ELSE excluded.replied_at END,
            response_hours = CASE WHEN received_emails.replied = 1
                                  THEN received_emails.response_hours
                                  ELSE excluded.response_hours END,
            replied = MAX(received_emails.replied, excluded.replied)",
    )?;

    stmt.execute(params![
        r.user_email,
        r.sender_email,
        r.subject,
        to_db_timestamp(&r.received_at),
        r.thread_id,
        if r.replied { 1 } else { 0 },
        r.replied_at.as_ref().map(to_db_timestamp),
        r.response_hours,
        Local::now().to_rfc3339(),
        r.body_preview,
    ])?;
    Ok(())
}

pub fn load_received(conn: &Connection, thread_id: &str) -> AppResult<Vec<ReceivedEmail>> {
    let mut stmt = conn.prepare(
        "SELECT user_email, sender_email, subject, received_at, thread_id,
                replied, replied_at, response_hours, body_preview
         FROM received_emails
         WHERE thread_id = ?1
         ORDER BY received_at ASC",
    )?;

    let rows = stmt.query_map([thread_id], |row| {
        Ok(ReceivedEmail {
            user_email: row.get(0)?,
            sender_email: row.get(1)?,
            subject: row.get(2)?,
            received_at: timestamp_column(row, 3)?,
            thread_id: row.get(4)?,
            replied: row.get::<_, i64>(5)? == 1,
            replied_at: opt_timestamp_column(row, 6)?,
            response_hours: row.get(7)?,
            body_preview: row.get(8)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn keys_query(conn: &Connection, sql: &str, thread_id: &str) -> AppResult<HashSet<PairKey>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map([thread_id], |row| {
        Ok(PairKey {
            thread_id: row.get(0)?,
            replied_at: timestamp_column(row, 1)?,
        })
    })?;

    let mut out = HashSet::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}

pub fn pair_keys_for_thread(conn: &Connection, thread_id: &str) -> AppResult<HashSet<PairKey>> {
    keys_query(
        conn,
        "SELECT thread_id, replied_at FROM response_pairs WHERE thread_id = ?1",
        thread_id,
    )
}

pub fn excluded_keys_for_thread(conn: &Connection, thread_id: &str) -> AppResult<HashSet<PairKey>> {
    keys_query(
        conn,
        "SELECT thread_id, replied_at FROM excluded_response_pairs WHERE thread_id = ?1",
        thread_id,
    )
}

pub fn whitelisted_keys_for_thread(
    conn: &Connection,
    thread_id: &str,
) -> AppResult<HashSet<PairKey>> {
    keys_query(
        conn,
        "SELECT thread_id, replied_at FROM whitelisted_response_pairs WHERE thread_id = ?1",
        thread_id,
    )
}

/// Pairs of `user` (all users when `None`) replied in `[from, to)`, oldest first.
pub fn load_pairs(
    conn: &Connection,
    user: Option<&str>,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> AppResult<Vec<ResponsePair>> {
    let sql = format!(
        "SELECT {PAIR_COLUMNS} FROM response_pairs
         WHERE replied_at >= ?1 AND replied_at < ?2
           AND (?3 IS NULL OR user_email = ?3)
         ORDER BY replied_at ASC, thread_id ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![to_db_timestamp(from), to_db_timestamp(to), user],
        map_pair,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn find_pair(conn: &Connection, key: &PairKey) -> AppResult<Option<ResponsePair>> {
    let sql = format!(
        "SELECT {PAIR_COLUMNS} FROM response_pairs
         WHERE thread_id = ?1 AND replied_at = ?2"
    );
    let pair = conn
        .query_row(
            &sql,
            params![key.thread_id, to_db_timestamp(&key.replied_at)],
            map_pair,
        )
        .optional()?;
    Ok(pair)
}

pub fn delete_pair(conn: &Connection, key: &PairKey) -> AppResult<bool> {
    let n = conn.execute(
        "DELETE FROM response_pairs WHERE thread_id = ?1 AND replied_at = ?2",
        params![key.thread_id, to_db_timestamp(&key.replied_at)],
    )?;
    Ok(n > 0)
}
