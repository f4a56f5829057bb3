//! Unified application error type.
//! All modules (db, core, mail, cli, utils) return AppError to keep the error
//! handling consistent and easy to manage.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    // ---------------------------
    // Core errors
    // ---------------------------
    #[error("Invalid interval: end {end} is before start {start}")]
    InvalidInterval { start: String, end: String },

    #[error("Fetch failed for {user}: {reason}")]
    FetchFailure { user: String, reason: String },

    #[error("Persist failed for {user}: {reason}")]
    PersistFailure { user: String, reason: String },

    /// Diagnostic only: logged by the reconciler, never returned by the pipeline.
    #[error("Malformed address: {0:?}")]
    MalformedAddress(String),

    #[error("Sync finished with {0} failed user(s)")]
    SyncFailed(usize),

    // ---------------------------
    // Lookup errors
    // ---------------------------
    #[error("Unknown tracked user: {0}")]
    UnknownUser(String),

    #[error("User {0} is already tracked (use `user edit`)")]
    UserExists(String),

    #[error("No response pair for thread {thread_id} replied at {replied_at}")]
    PairNotFound {
        thread_id: String,
        replied_at: String,
    },

    #[error("No out-of-office period {start}..{end} for {user}")]
    OooNotFound {
        user: String,
        start: String,
        end: String,
    },

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration")]
    ConfigLoad,

    #[error("Failed to save configuration")]
    ConfigSave,

    // ---------------------------
    // Export errors
    // ---------------------------
    #[error("Export error: {0}")]
    Export(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

pub type AppResult<T> = Result<T, AppError>;
