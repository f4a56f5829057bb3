//! SQLite connection wrapper (lightweight for CLI usage).

use crate::db::initialize::init_db;
use crate::errors::AppResult;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Busy timeout used when the caller does not configure one.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct DbPool {
    pub conn: Connection,
}

impl DbPool {
    /// Open the database file without touching the schema.
    pub fn new(path: &str) -> AppResult<Self> {
        Self::with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open the database file; every statement waits at most `timeout` on a locked DB.
    pub fn with_timeout(path: &str, timeout: Duration) -> AppResult<Self> {
        let conn = Connection::open(Path::new(path))?;
        conn.busy_timeout(timeout)?;
        Ok(Self { conn })
    }

    /// Open and bring the schema up to date (idempotent).
    pub fn open(path: &str, timeout: Duration) -> AppResult<Self> {
        let pool = Self::with_timeout(path, timeout)?;
        init_db(&pool.conn)?;
        Ok(pool)
    }

    /// Fresh in-memory database with the full schema.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Helper to execute a closure with a mutable connection reference.
    pub fn with_conn<F, T>(&mut self, func: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection) -> AppResult<T>,
    {
        func(&mut self.conn)
    }
}
