//! Thread reconciliation: pairs external messages with the user's replies.
//!
//! A thread is scanned in time order while keeping one open slot per external
//! sender. A message from an external sender opens that sender's slot (or
//! joins it as a further waiting message); a message from the user closes the
//! slots of the senders it is addressed to and forms at most one pair, keyed
//! by (thread_id, replied_at). The slot map lives only for one call.

use crate::core::calculator::working_time::working_duration;
use crate::core::classifier::{NoiseFilter, OrgDomains};
use crate::errors::AppError;
use crate::models::message::{MailMessage, MailThread};
use crate::models::ooo::OooPeriod;
use crate::models::pair::{PairKey, ReceivedEmail, ResponsePair, ThreadKeys};
use crate::models::user::WorkSchedule;
use crate::utils::time::{hours_between, local_date};
use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use std::collections::{BTreeMap, HashMap};

/// Everything the reconciler needs besides the thread itself.
pub struct ReconcileContext<'a> {
    pub user_email: &'a str,
    pub schedule: &'a WorkSchedule,
    pub ooo: &'a [OooPeriod],
    pub domains: &'a OrgDomains,
    pub noise: &'a NoiseFilter,
    pub keys: &'a ThreadKeys,
    /// Pairs with a longer raw gap are dropped unless whitelisted.
    pub max_gap: Duration,
}

/// Why a formed pair did not make it into `new_pairs`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropCounts {
    pub existing: usize,
    pub excluded: usize,
    pub too_old: usize,
    pub invalid_interval: usize,
}

#[derive(Debug, Default)]
pub struct ThreadOutcome {
    pub new_pairs: Vec<ResponsePair>,
    /// Received messages closed by a reply (replied = true).
    pub answered_received: Vec<ReceivedEmail>,
    /// Received messages still waiting at the end of the thread (replied = false).
    pub unmatched_received: Vec<ReceivedEmail>,
    pub received_per_day: BTreeMap<NaiveDate, i64>,
    pub sent_per_day: BTreeMap<NaiveDate, i64>,
    pub dropped: DropCounts,
    pub malformed_senders: usize,
}

/// Open received event for one external sender.
struct OpenSlot {
    opened_at: DateTime<Utc>,
    /// Indices into the received list, oldest first.
    waiting: Vec<usize>,
}

pub fn reconcile(thread: &MailThread, ctx: &ReconcileContext) -> ThreadOutcome {
    let mut messages: Vec<&MailMessage> = thread.messages.iter().collect();
    messages.sort_by_key(|m| m.timestamp);

    let user = ctx.user_email.trim().to_lowercase();
    let tz = &ctx.schedule.timezone;

    let mut outcome = ThreadOutcome::default();
    let mut received: Vec<ReceivedEmail> = Vec::new();
    let mut pending: HashMap<String, OpenSlot> = HashMap::new();

    for msg in messages {
        let sender = msg.sender.trim().to_lowercase();
        // Stored instants have whole-second precision.
        let at = msg.timestamp.trunc_subsecs(0);
        let day = local_date(&at, tz);

        if sender == user {
            *outcome.sent_per_day.entry(day).or_default() += 1;
            close_slots(thread, msg, ctx, &mut pending, &mut received, &mut outcome);
            continue;
        }

        if ctx.noise.is_noise(&sender) {
            continue;
        }

        let class = ctx.domains.classify(&sender);
        if class.malformed {
            log::warn!(
                "{} in thread {} (user {})",
                AppError::MalformedAddress(sender.clone()),
                thread.id,
                user
            );
            outcome.malformed_senders += 1;
        }

        if class.is_internal() {
            continue;
        }

        *outcome.received_per_day.entry(day).or_default() += 1;

        let idx = received.len();
        received.push(ReceivedEmail {
            user_email: user.clone(),
            sender_email: sender.clone(),
            subject: subject_for(thread, msg),
            received_at: at,
            thread_id: thread.id.clone(),
            replied: false,
            replied_at: None,
            response_hours: None,
            body_preview: msg.body_preview.clone(),
        });

        pending
            .entry(sender)
            .or_insert_with(|| OpenSlot {
                opened_at: at,
                waiting: Vec::new(),
            })
            .waiting
            .push(idx);
    }

    for rec in received {
        if rec.replied {
            outcome.answered_received.push(rec);
        } else {
            outcome.unmatched_received.push(rec);
        }
    }

    outcome
}

fn subject_for(thread: &MailThread, msg: &MailMessage) -> String {
    if thread.subject.trim().is_empty() {
        msg.subject.clone()
    } else {
        thread.subject.clone()
    }
}

/// Close the slots a reply answers and form at most one pair from them.
fn close_slots(
    thread: &MailThread,
    reply: &MailMessage,
    ctx: &ReconcileContext,
    pending: &mut HashMap<String, OpenSlot>,
    received: &mut [ReceivedEmail],
    outcome: &mut ThreadOutcome,
) {
    let replied_at = reply.timestamp.trunc_subsecs(0);

    // Only slots opened strictly before the reply can be answered by it.
    let targets: Vec<String> = pending
        .iter()
        .filter(|(_, slot)| slot.opened_at < replied_at)
        .filter(|(sender, _)| reply.recipients.is_empty() || reply.is_addressed_to(sender))
        .map(|(sender, _)| sender.clone())
        .collect();

    if targets.is_empty() {
        return;
    }

    let mut closed: Vec<(String, OpenSlot)> = targets
        .into_iter()
        .filter_map(|s| pending.remove(&s).map(|slot| (s, slot)))
        .collect();
    closed.sort_by_key(|(_, slot)| slot.waiting[0]);

    for (_, slot) in &closed {
        for &i in &slot.waiting {
            let rec = &mut received[i];
            rec.replied = true;
            rec.replied_at = Some(replied_at);
            rec.response_hours = Some(hours_between(&rec.received_at, &replied_at));
        }
    }

    // The longest-waiting sender gets the pair; one reply, one key.
    let (sender, slot) = &closed[0];
    let first = &received[slot.waiting[0]];
    let key = PairKey::new(&thread.id, replied_at);

    if ctx.keys.excluded.contains(&key) {
        log::debug!("pair {} is excluded", key);
        outcome.dropped.excluded += 1;
        return;
    }

    if ctx.keys.existing.contains(&key) {
        outcome.dropped.existing += 1;
        return;
    }

    if replied_at - slot.opened_at > ctx.max_gap && !ctx.keys.whitelisted.contains(&key) {
        log::debug!("pair {} exceeds the response gap limit", key);
        outcome.dropped.too_old += 1;
        return;
    }

    let adjusted = match working_duration(slot.opened_at, replied_at, ctx.schedule, ctx.ooo) {
        Ok(h) => h,
        Err(e) => {
            log::warn!("skipping pair {}: {}", key, e);
            outcome.dropped.invalid_interval += 1;
            return;
        }
    };

    outcome.new_pairs.push(ResponsePair {
        user_email: first.user_email.clone(),
        external_sender: sender.clone(),
        subject: first.subject.clone(),
        received_at: slot.opened_at,
        replied_at,
        response_hours: hours_between(&slot.opened_at, &replied_at),
        adjusted_response_hours: adjusted,
        thread_id: thread.id.clone(),
    });
}
