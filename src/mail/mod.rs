//! Mail collaborator: where threads come from, and the validation applied
//! before they reach the reconciler.

pub mod json_source;

use crate::errors::AppResult;
use crate::models::message::{MailMessage, MailThread, body_preview};
use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

pub use json_source::JsonMailSource;

/// A mailbox provider. Implementations must be shareable across threads:
/// the orchestrator runs each fetch on a helper thread bounded by a timeout.
pub trait MailSource: Send + Sync {
    /// Threads with activity at or after `since`, messages in time order.
    fn fetch_threads(&self, user_email: &str, since: DateTime<Utc>) -> AppResult<Vec<MailThread>>;
}

/// A thread as delivered by a provider, headers still raw.
#[derive(Debug, Clone, Deserialize)]
pub struct RawThread {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub cc: String,
    pub date: String,
    #[serde(default)]
    pub subject: String,
    /// Plain-text body; providers that only hand out a snippet may use `snippet`.
    #[serde(default, alias = "snippet")]
    pub body: Option<String>,
}

fn angle_addr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([^<>]*)>").expect("static regex"))
}

/// `"Jane Doe" <Jane@Example.com>` → `jane@example.com`.
pub fn normalize_address(header: &str) -> String {
    let header = header.trim();
    let addr = angle_addr_re()
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(header);
    addr.trim().trim_matches('"').to_lowercase()
}

/// Split an address-list header (To / Cc) into bare lowercase addresses.
pub fn parse_address_list(header: &str) -> Vec<String> {
    let header = header.trim();
    if header.is_empty() {
        return Vec::new();
    }

    // Display names may contain commas, so prefer the bracketed parts.
    if header.contains('<') {
        return angle_addr_re()
            .captures_iter(header)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
    }

    header
        .split(',')
        .map(normalize_address)
        .filter(|a| !a.is_empty())
        .collect()
}

/// Parse a `Date` header. RFC 2822 (with an optional trailing `(TZ)` comment)
/// or RFC 3339. Cut to whole seconds, the precision pair keys are stored at.
pub fn parse_message_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let without_comment = match value.rfind(" (") {
        Some(pos) if value.ends_with(')') => &value[..pos],
        _ => value,
    };

    DateTime::parse_from_rfc2822(without_comment)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(0))
        .ok()
}

/// Validate a raw thread into the fixed message shape.
///
/// Messages without a parseable date are dropped (with a warning); the rest
/// are sorted by time. Returns `None` when nothing usable is left.
pub fn validate_thread(raw: RawThread) -> Option<MailThread> {
    let mut messages = Vec::with_capacity(raw.messages.len());

    for m in raw.messages {
        let Some(timestamp) = parse_message_date(&m.date) else {
            log::warn!(
                "thread {}: dropping message from {:?} with unparseable date {:?}",
                raw.id,
                m.from,
                m.date
            );
            continue;
        };

        let mut recipients = parse_address_list(&m.to);
        recipients.extend(parse_address_list(&m.cc));

        messages.push(MailMessage {
            sender: normalize_address(&m.from),
            recipients,
            timestamp,
            thread_id: raw.id.clone(),
            subject: m.subject.trim().to_string(),
            body_preview: m.body.as_deref().and_then(body_preview),
        });
    }

    if messages.is_empty() {
        return None;
    }

    let mut thread = MailThread {
        id: raw.id,
        subject: String::new(),
        messages,
    };
    thread.sort_chronologically();
    // The thread is named after its opening message.
    thread.subject = thread.messages[0].subject.clone();
    Some(thread)
}
