use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use rusqlite::OptionalExtension;
use std::fs;

const COUNTED_TABLES: &[(&str, &str)] = &[
    ("tracked_users", "Tracked users"),
    ("received_emails", "Received emails"),
    ("response_pairs", "Response pairs"),
    ("daily_stats", "Daily stats rows"),
    ("user_out_of_office", "Out-of-office periods"),
    ("excluded_response_pairs", "Excluded pairs"),
    ("whitelisted_response_pairs", "Whitelisted pairs"),
];

pub fn print_db_info(pool: &mut DbPool, db_path: &str) -> AppResult<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);

    //
    // 2) ROW COUNTS
    //
    for (table, label) in COUNTED_TABLES {
        let count: i64 =
            pool.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        println!("{}• {}:{} {}{}{}", CYAN, label, RESET, GREEN, count, RESET);
    }

    //
    // 3) REPLY RANGE
    //
    let first: Option<String> = pool
        .conn
        .query_row("SELECT MIN(replied_at) FROM response_pairs", [], |row| row.get(0))
        .optional()?
        .flatten();
    let last: Option<String> = pool
        .conn
        .query_row("SELECT MAX(replied_at) FROM response_pairs", [], |row| row.get(0))
        .optional()?
        .flatten();

    let fmt = |v: Option<String>| v.unwrap_or_else(|| format!("{GREY}--{RESET}"));

    println!("{}• Replies:{}", CYAN, RESET);
    println!("    from: {}", fmt(first));
    println!("    to:   {}", fmt(last));

    //
    // 4) LAST SYNC
    //
    let last_sync: Option<String> = pool
        .conn
        .query_row("SELECT MAX(last_synced_at) FROM tracked_users", [], |row| row.get(0))
        .optional()?
        .flatten();
    println!("{}• Last sync:{} {}", CYAN, RESET, fmt(last_sync));

    println!();
    Ok(())
}
