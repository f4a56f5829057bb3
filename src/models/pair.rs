use crate::utils::time::to_db_timestamp;
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashSet;
use std::fmt;

/// Identity of a reply event: at most one response pair per key.
/// Shared by `response_pairs`, `excluded_response_pairs` and `whitelisted_response_pairs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub thread_id: String,
    pub replied_at: DateTime<Utc>,
}

impl PairKey {
    /// `replied_at` is kept at whole seconds so keys built from mail compare
    /// equal to keys read back from the database.
    pub fn new(thread_id: &str, replied_at: DateTime<Utc>) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            replied_at: replied_at.trunc_subsecs(0),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.thread_id, to_db_timestamp(&self.replied_at))
    }
}

/// A received external message matched with the user's next reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePair {
    pub user_email: String,
    pub external_sender: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
    pub replied_at: DateTime<Utc>,
    pub response_hours: f64,
    pub adjusted_response_hours: f64,
    pub thread_id: String,
}

impl ResponsePair {
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.thread_id, self.replied_at)
    }
}

/// An inbound external message and its reply status.
/// Unique on (thread_id, received_at).
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEmail {
    pub user_email: String,
    pub sender_email: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
    pub thread_id: String,
    pub replied: bool,
    pub replied_at: Option<DateTime<Utc>>,
    pub response_hours: Option<f64>,
    pub body_preview: Option<String>,
}

/// Keys already known to the store for one thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadKeys {
    pub existing: HashSet<PairKey>,
    pub excluded: HashSet<PairKey>,
    pub whitelisted: HashSet<PairKey>,
}
