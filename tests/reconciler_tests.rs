use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rreplytracker::core::classifier::{NoiseFilter, OrgDomains};
use rreplytracker::core::reconciler::{ReconcileContext, ThreadOutcome, reconcile};
use rreplytracker::models::message::{MailMessage, MailThread};
use rreplytracker::models::pair::{PairKey, ThreadKeys};
use rreplytracker::models::user::WorkSchedule;
use std::collections::HashSet;

const NY: Tz = chrono_tz::America::New_York;
const USER: &str = "contact@lumiere.education";

fn ny(s: &str) -> DateTime<Utc> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
    NY.from_local_datetime(&naive)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

fn msg(from: &str, to: &[&str], at: &str) -> MailMessage {
    MailMessage {
        sender: from.to_string(),
        recipients: to.iter().map(|s| s.to_string()).collect(),
        timestamp: ny(at),
        thread_id: "t-1".into(),
        subject: "Program question".into(),
        body_preview: None,
    }
}

fn thread(messages: Vec<MailMessage>) -> MailThread {
    MailThread {
        id: "t-1".into(),
        subject: "Program question".into(),
        messages,
    }
}

struct Fixture {
    schedule: WorkSchedule,
    domains: OrgDomains,
    noise: NoiseFilter,
    keys: ThreadKeys,
}

impl Fixture {
    fn new() -> Self {
        Self {
            schedule: WorkSchedule {
                work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                work_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                timezone: NY,
                exclude_weekends: true,
            },
            domains: OrgDomains::new(["lumiere.education", "ladderinternships.com"]),
            noise: NoiseFilter::new(["noreply", "mailer-daemon"]),
            keys: ThreadKeys::default(),
        }
    }

    fn run(&self, t: &MailThread) -> ThreadOutcome {
        let ctx = ReconcileContext {
            user_email: USER,
            schedule: &self.schedule,
            ooo: &[],
            domains: &self.domains,
            noise: &self.noise,
            keys: &self.keys,
            max_gap: Duration::days(7),
        };
        reconcile(t, &ctx)
    }
}

#[test]
fn reply_next_morning_forms_adjusted_pair() {
    let f = Fixture::new();
    let t = thread(vec![
        msg("client@gmail.com", &[USER], "2025-03-17 16:00"),
        msg(USER, &["client@gmail.com"], "2025-03-18 10:00"),
    ]);

    let out = f.run(&t);
    assert_eq!(out.new_pairs.len(), 1);

    let p = &out.new_pairs[0];
    assert_eq!(p.external_sender, "client@gmail.com");
    assert_eq!(p.response_hours, 18.0);
    assert_eq!(p.adjusted_response_hours, 2.0);
    assert_eq!(out.answered_received.len(), 1);
    assert!(out.unmatched_received.is_empty());
}

#[test]
fn interleaved_senders_are_paired_independently() {
    let f = Fixture::new();
    let t = thread(vec![
        msg("alice@gmail.com", &[USER], "2025-03-17 10:00"),
        msg("bob@yahoo.com", &[USER, "alice@gmail.com"], "2025-03-17 10:30"),
        msg(USER, &["alice@gmail.com"], "2025-03-17 11:00"),
        msg(USER, &["bob@yahoo.com"], "2025-03-17 12:00"),
    ]);

    let out = f.run(&t);
    let senders: Vec<&str> = out
        .new_pairs
        .iter()
        .map(|p| p.external_sender.as_str())
        .collect();
    assert_eq!(senders, vec!["alice@gmail.com", "bob@yahoo.com"]);
    assert_eq!(out.new_pairs[0].response_hours, 1.0);
    assert_eq!(out.new_pairs[1].response_hours, 1.5);
}

#[test]
fn reply_to_one_sender_leaves_the_other_open() {
    let f = Fixture::new();
    let t = thread(vec![
        msg("alice@gmail.com", &[USER], "2025-03-17 10:00"),
        msg("bob@yahoo.com", &[USER], "2025-03-17 10:30"),
        msg(USER, &["alice@gmail.com"], "2025-03-17 11:00"),
    ]);

    let out = f.run(&t);
    assert_eq!(out.new_pairs.len(), 1);
    assert_eq!(out.unmatched_received.len(), 1);
    assert_eq!(out.unmatched_received[0].sender_email, "bob@yahoo.com");
    assert!(!out.unmatched_received[0].replied);
}

#[test]
fn second_run_with_recorded_keys_creates_nothing() {
    let mut f = Fixture::new();
    let t = thread(vec![
        msg("alice@gmail.com", &[USER], "2025-03-17 10:00"),
        msg(USER, &["alice@gmail.com"], "2025-03-17 11:00"),
        msg("alice@gmail.com", &[USER], "2025-03-17 13:00"),
        msg(USER, &["alice@gmail.com"], "2025-03-17 15:00"),
    ]);

    let first = f.run(&t);
    assert_eq!(first.new_pairs.len(), 2);

    f.keys.existing = first.new_pairs.iter().map(|p| p.key()).collect();
    let second = f.run(&t);
    assert!(second.new_pairs.is_empty());
    assert_eq!(second.dropped.existing, 2);
    // Bookkeeping is still reported so received rows stay up to date.
    assert_eq!(second.answered_received.len(), 2);
}

#[test]
fn excluded_key_wins_over_whitelist() {
    let mut f = Fixture::new();
    let t = thread(vec![
        msg("alice@gmail.com", &[USER], "2025-03-17 10:00"),
        msg(USER, &["alice@gmail.com"], "2025-03-17 11:00"),
    ]);
    let key = PairKey::new("t-1", ny("2025-03-17 11:00"));
    f.keys.excluded = HashSet::from([key.clone()]);
    f.keys.whitelisted = HashSet::from([key]);

    let out = f.run(&t);
    assert!(out.new_pairs.is_empty());
    assert_eq!(out.dropped.excluded, 1);
}

#[test]
fn stale_pairs_need_a_whitelist_entry() {
    let mut f = Fixture::new();
    let t = thread(vec![
        msg("alice@gmail.com", &[USER], "2025-03-03 10:00"),
        msg(USER, &["alice@gmail.com"], "2025-03-17 11:00"),
    ]);

    let out = f.run(&t);
    assert!(out.new_pairs.is_empty());
    assert_eq!(out.dropped.too_old, 1);

    f.keys.whitelisted = HashSet::from([PairKey::new("t-1", ny("2025-03-17 11:00"))]);
    let out = f.run(&t);
    assert_eq!(out.new_pairs.len(), 1);
    let p = &out.new_pairs[0];
    assert!(p.adjusted_response_hours <= p.response_hours);
}

#[test]
fn noise_and_internal_senders_are_not_tracked() {
    let f = Fixture::new();
    let t = thread(vec![
        msg("noreply@service.com", &[USER], "2025-03-17 09:00"),
        msg("mentor@ladderinternships.com", &[USER], "2025-03-17 09:30"),
        msg(USER, &[], "2025-03-17 10:00"),
    ]);

    let out = f.run(&t);
    assert!(out.new_pairs.is_empty());
    assert!(out.answered_received.is_empty());
    assert!(out.unmatched_received.is_empty());
    assert!(out.received_per_day.is_empty());
    assert_eq!(out.sent_per_day.values().sum::<i64>(), 1);
}

#[test]
fn follow_ups_keep_the_first_received_time() {
    let f = Fixture::new();
    let t = thread(vec![
        msg(USER, &["alice@gmail.com"], "2025-03-17 11:00"),
        msg("alice@gmail.com", &[USER], "2025-03-17 10:00"),
        msg("alice@gmail.com", &[USER], "2025-03-17 09:00"),
    ]);

    let out = f.run(&t);
    assert_eq!(out.new_pairs.len(), 1);
    assert_eq!(out.new_pairs[0].received_at, ny("2025-03-17 09:00"));
    assert_eq!(out.new_pairs[0].response_hours, 2.0);
    assert_eq!(out.answered_received.len(), 2);
    assert!(out.answered_received.iter().all(|r| r.replied));
}

#[test]
fn reply_all_forms_one_pair_and_closes_both() {
    let f = Fixture::new();
    let t = thread(vec![
        msg("alice@gmail.com", &[USER], "2025-03-17 10:00"),
        msg("bob@yahoo.com", &[USER], "2025-03-17 10:30"),
        msg(USER, &["alice@gmail.com", "bob@yahoo.com"], "2025-03-17 11:00"),
    ]);

    let out = f.run(&t);
    assert_eq!(out.new_pairs.len(), 1);
    assert_eq!(out.new_pairs[0].external_sender, "alice@gmail.com");
    assert_eq!(out.answered_received.len(), 2);
    assert!(out.unmatched_received.is_empty());
}

#[test]
fn malformed_sender_is_flagged_but_still_tracked() {
    let f = Fixture::new();
    let t = thread(vec![
        msg("undisclosed-recipients", &[USER], "2025-03-17 10:00"),
        msg(USER, &[], "2025-03-17 10:15"),
    ]);

    let out = f.run(&t);
    assert_eq!(out.malformed_senders, 1);
    assert_eq!(out.new_pairs.len(), 1);
}

#[test]
fn received_rows_carry_the_body_preview() {
    let f = Fixture::new();
    let mut question = msg("alice@gmail.com", &[USER], "2025-03-17 10:00");
    question.body_preview = Some("Is the summer cohort still open?".into());
    let t = thread(vec![question, msg("bob@yahoo.com", &[USER], "2025-03-17 10:30")]);

    let out = f.run(&t);
    let previews: Vec<Option<&str>> = out
        .unmatched_received
        .iter()
        .map(|r| r.body_preview.as_deref())
        .collect();
    assert_eq!(previews, vec![Some("Is the summer cohort still open?"), None]);
}

#[test]
fn subsecond_reply_times_are_cut_to_whole_seconds() {
    let f = Fixture::new();
    let mut reply = msg(USER, &["alice@gmail.com"], "2025-03-17 11:00");
    reply.timestamp = reply.timestamp + Duration::milliseconds(500);
    let t = thread(vec![msg("alice@gmail.com", &[USER], "2025-03-17 10:00"), reply]);

    let out = f.run(&t);
    assert_eq!(out.new_pairs[0].replied_at, ny("2025-03-17 11:00"));
    assert_eq!(out.new_pairs[0].response_hours, 1.0);
    assert_eq!(out.new_pairs[0].key(), PairKey::new("t-1", ny("2025-03-17 11:00")));
}
