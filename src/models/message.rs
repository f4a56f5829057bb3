use chrono::{DateTime, Utc};

/// A validated message, as handed from the mail boundary to the reconciler.
///
/// Addresses are bare and lowercase (`jane@example.com`, no display name).
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub sender: String,
    pub recipients: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub thread_id: String,
    pub subject: String,
    /// Start of the plain-text body, at most `BODY_PREVIEW_CHARS` characters.
    pub body_preview: Option<String>,
}

/// Longest body preview kept per received email.
pub const BODY_PREVIEW_CHARS: usize = 1000;

/// Trimmed, whitespace-collapsed preview of a message body; `None` when blank.
pub fn body_preview(body: &str) -> Option<String> {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(BODY_PREVIEW_CHARS).collect())
}

impl MailMessage {
    pub fn is_addressed_to(&self, address: &str) -> bool {
        self.recipients.iter().any(|r| r == address)
    }
}

/// A conversation: messages sharing one thread id, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct MailThread {
    pub id: String,
    pub subject: String,
    pub messages: Vec<MailMessage>,
}

impl MailThread {
    /// Restore time order if the source did not guarantee it.
    /// Stable, so messages sharing a timestamp keep their source order.
    pub fn sort_chronologically(&mut self) {
        self.messages.sort_by_key(|m| m.timestamp);
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.messages.iter().map(|m| m.timestamp).max()
    }
}
