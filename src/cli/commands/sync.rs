use crate::cli::commands::open_pool;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::sync::{MAX_LOOKBACK_DAYS, SyncRequest, SyncSettings, run_sync};
use crate::errors::{AppError, AppResult};
use crate::mail::{JsonMailSource, MailSource};
use crate::ui::messages::{detail, error, info, success, warning};
use crate::utils::path::expand_tilde;
use std::sync::Arc;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Sync {
        user,
        backfill,
        lookback,
        dry_run,
    } = cmd
    else {
        return Ok(());
    };

    if let Some(days) = lookback
        && !(1..=MAX_LOOKBACK_DAYS).contains(days)
    {
        return Err(AppError::Other(format!(
            "--lookback must be between 1 and {}, got {}",
            MAX_LOOKBACK_DAYS, days
        )));
    }

    let mut pool = open_pool(cfg)?;
    let mail_dir = expand_tilde(&cfg.mail_dir);
    let source: Arc<dyn MailSource> = Arc::new(JsonMailSource::new(&mail_dir));

    let request = SyncRequest {
        user: user.clone(),
        backfill: *backfill,
        lookback_days: *lookback,
        dry_run: *dry_run,
    };

    info(format!(
        "Syncing from {}{}",
        mail_dir.display(),
        if *dry_run { " (dry run)" } else { "" }
    ));

    let summary = run_sync(&request, source, &mut pool, &SyncSettings::from_config(cfg))?;

    if summary.results.is_empty() {
        warning("No active users to sync.");
        return Ok(());
    }

    for r in &summary.results {
        match &r.outcome {
            Ok(s) => {
                success(format!(
                    "{}: {} new pair(s), {} received, {} day(s) updated",
                    r.email, s.new_pairs, s.received_recorded, s.days_updated
                ));
                if let Some(start) = s.window_start {
                    detail(format!("window from {} · {} thread(s)", start, s.threads));
                }
                let d = &s.dropped;
                if d.existing + d.excluded + d.too_old + d.invalid_interval > 0 {
                    detail(format!(
                        "skipped: {} existing, {} excluded, {} over max gap, {} invalid",
                        d.existing, d.excluded, d.too_old, d.invalid_interval
                    ));
                }
                if s.malformed_senders > 0 {
                    detail(format!("{} malformed sender address(es)", s.malformed_senders));
                }
            }
            Err(e) => error(format!("{}: {}", r.email, e)),
        }
    }

    info(format!(
        "{} of {} user(s) synced, {} new pair(s) in total",
        summary.succeeded(),
        summary.results.len(),
        summary.total_new_pairs()
    ));

    match summary.failed() {
        0 => Ok(()),
        n => Err(AppError::SyncFailed(n)),
    }
}
