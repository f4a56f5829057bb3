use crate::db::queries::date_column;
use crate::errors::AppResult;
use crate::models::daily_stat::{DailyStat, Summary};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, Row, params};

const STAT_COLUMNS: &str = "user_email, date, emails_received, emails_sent, response_pairs_count, \
     avg_response_hours, median_response_hours, min_response_hours, max_response_hours, \
     avg_adjusted_hours, median_adjusted_hours, min_adjusted_hours, max_adjusted_hours";

fn summary_at(row: &Row, first: usize) -> rusqlite::Result<Option<Summary>> {
    let avg: Option<f64> = row.get(first)?;
    let median: Option<f64> = row.get(first + 1)?;
    let min: Option<f64> = row.get(first + 2)?;
    let max: Option<f64> = row.get(first + 3)?;

    Ok(match (avg, median, min, max) {
        (Some(avg), Some(median), Some(min), Some(max)) => Some(Summary {
            avg,
            median,
            min,
            max,
        }),
        _ => None,
    })
}

fn map_stat(row: &Row) -> rusqlite::Result<DailyStat> {
    Ok(DailyStat {
        user_email: row.get(0)?,
        date: date_column(row, 1)?,
        emails_received: row.get(2)?,
        emails_sent: row.get(3)?,
        response_pairs_count: row.get(4)?,
        raw: summary_at(row, 5)?,
        adjusted: summary_at(row, 9)?,
    })
}

/// Insert or replace the rollup for (user, date).
pub fn upsert_daily_stat(conn: &Connection, s: &DailyStat) -> AppResult<()> {
    let raw = s.raw;
    let adj = s.adjusted;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO daily_stats
            (user_email, date, emails_received, emails_sent, response_pairs_count,
             avg_response_hours, median_response_hours, min_response_hours, max_response_hours,
             avg_adjusted_hours, median_adjusted_hours, min_adjusted_hours, max_adjusted_hours,
             updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(user_email, date) DO UPDATE SET
            emails_received       = excluded.emails_received,
            emails_sent           = excluded.emails_sent,
            response_pairs_count  = excluded.response_pairs_count,
            avg_response_hours    = excluded.avg_response_hours,
            median_response_hours = excluded.median_response_hours,
            min_response_hours    = excluded.min_response_hours,
            max_response_hours    = excluded.max_response_hours,
            avg_adjusted_hours    = excluded.avg_adjusted_hours,
            median_adjusted_hours = excluded.median_adjusted_hours,
            min_adjusted_hours    = excluded.min_adjusted_hours,
            max_adjusted_hours    = excluded.max_adjusted_hours,
            updated_at            = excluded.updated_at",
    )?;

    stmt.execute(params![
        s.user_email,
        s.date.format("%Y-%m-%d").to_string(),
        s.emails_received,
        s.emails_sent,
        s.response_pairs_count,
        raw.map(|x| x.avg),
        raw.map(|x| x.median),
        raw.map(|x| x.min),
        raw.map(|x| x.max),
        adj.map(|x| x.avg),
        adj.map(|x| x.median),
        adj.map(|x| x.min),
        adj.map(|x| x.max),
        Local::now().to_rfc3339(),
    ])?;
    Ok(())
}

pub fn load_daily_stat(conn: &Connection, user: &str, date: NaiveDate) -> AppResult<Option<DailyStat>> {
    let sql = format!("SELECT {STAT_COLUMNS} FROM daily_stats WHERE user_email = ?1 AND date = ?2");
    let stat = conn
        .query_row(&sql, params![user, date.format("%Y-%m-%d").to_string()], map_stat)
        .optional()?;
    Ok(stat)
}

/// Rollups in `[from, to]` (inclusive dates), by user then date.
pub fn load_daily_stats(
    conn: &Connection,
    user: Option<&str>,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<DailyStat>> {
    let sql = format!(
        "SELECT {STAT_COLUMNS} FROM daily_stats
         WHERE date >= ?1 AND date <= ?2
           AND (?3 IS NULL OR user_email = ?3)
         ORDER BY user_email ASC, date ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![
            from.format("%Y-%m-%d").to_string(),
            to.format("%Y-%m-%d").to_string(),
            user
        ],
        map_stat,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
