use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Local, NaiveTime, Utc};
use chrono_tz::Tz;

/// Working-hours window of a tracked user.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkSchedule {
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub timezone: Tz,
    pub exclude_weekends: bool,
}

impl WorkSchedule {
    /// True when the daily window has no positive length.
    pub fn is_empty_window(&self) -> bool {
        self.work_end <= self.work_start
    }
}

/// A mailbox whose response times are tracked.
/// ⇔ one row of `tracked_users`, keyed by `email`.
#[derive(Debug, Clone)]
pub struct TrackedUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub domain: String,
    pub team_function: String,
    pub is_active: bool,
    pub schedule: WorkSchedule,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: String,
}

impl TrackedUser {
    /// Build a new, active user. The email is lowercased and its domain derived.
    pub fn new(email: &str, schedule: WorkSchedule) -> AppResult<Self> {
        let email = email.trim().to_lowercase();
        let domain = domain_of(&email).ok_or_else(|| AppError::InvalidEmail(email.clone()))?;

        Ok(Self {
            id: 0,
            domain: domain.to_string(),
            email,
            name: String::new(),
            team_function: String::new(),
            is_active: true,
            schedule,
            last_synced_at: None,
            created_at: Local::now().to_rfc3339(),
        })
    }
}

/// Domain part of a well-formed address (`local@domain`), if any.
pub fn domain_of(email: &str) -> Option<&str> {
    let (local, domain) = email.rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(domain)
}
