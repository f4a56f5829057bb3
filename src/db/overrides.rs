//! Excluded and whitelisted response pairs.

use crate::db::pairs::map_pair;
use crate::db::queries::timestamp_column;
use crate::errors::AppResult;
use crate::models::pair::{PairKey, ResponsePair};
use crate::utils::time::to_db_timestamp;
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedPair {
    pub pair: ResponsePair,
    pub reason: String,
    pub excluded_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhitelistedPair {
    pub user_email: String,
    pub key: PairKey,
    pub note: String,
    pub whitelisted_at: String,
}

const EXCLUDED_COLUMNS: &str = "user_email, external_sender, subject, received_at, replied_at, \
     response_hours, adjusted_response_hours, thread_id, reason, excluded_at";

pub fn insert_excluded(conn: &Connection, p: &ResponsePair, reason: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO excluded_response_pairs
            (user_email, thread_id, replied_at, external_sender, subject, received_at,
             response_hours, adjusted_response_hours, reason, excluded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(thread_id, replied_at) DO UPDATE SET
            reason = excluded.reason",
        params![
            p.user_email,
            p.thread_id,
            to_db_timestamp(&p.replied_at),
            p.external_sender,
            p.subject,
            to_db_timestamp(&p.received_at),
            p.response_hours,
            p.adjusted_response_hours,
            reason,
            Local::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_excluded(conn: &Connection, key: &PairKey) -> AppResult<Option<ExcludedPair>> {
    let sql = format!(
        "SELECT {EXCLUDED_COLUMNS} FROM excluded_response_pairs
         WHERE thread_id = ?1 AND replied_at = ?2"
    );
    let row = conn
        .query_row(
            &sql,
            params![key.thread_id, to_db_timestamp(&key.replied_at)],
            |row| {
                Ok(ExcludedPair {
                    pair: map_pair(row)?,
                    reason: row.get(8)?,
                    excluded_at: row.get(9)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn delete_excluded(conn: &Connection, key: &PairKey) -> AppResult<bool> {
    let n = conn.execute(
        "DELETE FROM excluded_response_pairs WHERE thread_id = ?1 AND replied_at = ?2",
        params![key.thread_id, to_db_timestamp(&key.replied_at)],
    )?;
    Ok(n > 0)
}

pub fn list_excluded(conn: &Connection, user: Option<&str>) -> AppResult<Vec<ExcludedPair>> {
    let sql = format!(
        "SELECT {EXCLUDED_COLUMNS} FROM excluded_response_pairs
         WHERE (?1 IS NULL OR user_email = ?1)
         ORDER BY replied_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user], |row| {
        Ok(ExcludedPair {
            pair: map_pair(row)?,
            reason: row.get(8)?,
            excluded_at: row.get(9)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Every excluded key of one user, for filtering stats.
pub fn excluded_keys_for_user(conn: &Connection, user: &str) -> AppResult<HashSet<PairKey>> {
    let mut stmt = conn.prepare(
        "SELECT thread_id, replied_at FROM excluded_response_pairs WHERE user_email = ?1",
    )?;
    let rows = stmt.query_map([user], |row| {
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

pub fn upsert_whitelist(conn: &Connection, user: &str, key: &PairKey, note: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO whitelisted_response_pairs (user_email, thread_id, replied_at, note, whitelisted_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(thread_id, replied_at) DO UPDATE SET
            user_email = excluded.user_email,
            note       = excluded.note",
        params![
            user,
            key.thread_id,
            to_db_timestamp(&key.replied_at),
            note,
            Local::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn delete_whitelist(conn: &Connection, key: &PairKey) -> AppResult<bool> {
    let n = conn.execute(
        "DELETE FROM whitelisted_response_pairs WHERE thread_id = ?1 AND replied_at = ?2",
        params![key.thread_id, to_db_timestamp(&key.replied_at)],
    )?;
    Ok(n > 0)
}

pub fn list_whitelisted(conn: &Connection, user: Option<&str>) -> AppResult<Vec<WhitelistedPair>> {
    let mut stmt = conn.prepare(
        "SELECT user_email, thread_id, replied_at, note, whitelisted_at
         FROM whitelisted_response_pairs
         WHERE (?1 IS NULL OR user_email = ?1)
         ORDER BY replied_at ASC",
    )?;
    let rows = stmt.query_map(params![user], |row| {
        Ok(WhitelistedPair {
            user_email: row.get(0)?,
            key: PairKey {
                thread_id: row.get(1)?,
                replied_at: timestamp_column(row, 2)?,
            },
            note: row.get(3)?,
            whitelisted_at: row.get(4)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
