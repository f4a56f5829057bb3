//! File-backed mail source: one JSON export per mailbox.
//!
//! `<dir>/<user_email>.json` holds an array of threads:
//!
//! ```json
//! [{ "id": "18c0...", "messages": [
//!     { "from": "Client <client@gmail.com>", "to": "contact@lumiere.education",
//!       "date": "Mon, 17 Mar 2025 16:00:00 -0400", "subject": "Program question" }
//! ]}]
//! ```

use super::{MailSource, RawThread, validate_thread};
use crate::errors::{AppError, AppResult};
use crate::models::message::MailThread;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

pub struct JsonMailSource {
    dir: PathBuf,
}

impl JsonMailSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn mailbox_path(&self, user_email: &str) -> PathBuf {
        self.dir.join(format!("{}.json", user_email.trim().to_lowercase()))
    }
}

impl MailSource for JsonMailSource {
    fn fetch_threads(&self, user_email: &str, since: DateTime<Utc>) -> AppResult<Vec<MailThread>> {
        let path = self.mailbox_path(user_email);

        if !path.exists() {
            log::info!("no mailbox export at {}; treating as empty", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        let raw: Vec<RawThread> =
            serde_json::from_str(&content).map_err(|e| AppError::FetchFailure {
                user: user_email.to_string(),
                reason: format!("{}: {}", path.display(), e),
            })?;

        let total = raw.len();
        let threads: Vec<MailThread> = raw
            .into_iter()
            .filter_map(validate_thread)
            .filter(|t| t.last_activity().is_some_and(|ts| ts >= since))
            .collect();

        log::debug!(
            "{}: {} of {} threads active since {}",
            user_email,
            threads.len(),
            total,
            since
        );

        Ok(threads)
    }
}
