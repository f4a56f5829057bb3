use crate::cli::commands::{open_pool, pair_key};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::overrides::OverrideLogic;
use crate::db::overrides;
use crate::errors::{AppError, AppResult};
use crate::models::daily_stat::DailyStat;
use crate::ui::messages::{detail, info, success};
use crate::utils::table::{Column, Table};
use crate::utils::time::{format_opt_hours, to_db_timestamp};

fn describe_day(stat: &DailyStat) {
    detail(format!(
        "{} {}: {} pair(s), avg {} (adjusted {})",
        stat.user_email,
        stat.date,
        stat.response_pairs_count,
        format_opt_hours(stat.raw.map(|s| s.avg)),
        format_opt_hours(stat.adjusted.map(|s| s.avg)),
    ));
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    match cmd {
        Commands::Exclude {
            thread_id,
            replied_at,
            reason,
        } => {
            let key = pair_key(thread_id, replied_at)?;
            let mut pool = open_pool(cfg)?;
            let stat = OverrideLogic::exclude(&mut pool, &key, reason)?;
            success(format!("Excluded {}", key));
            describe_day(&stat);
        }

        Commands::Restore {
            thread_id,
            replied_at,
        } => {
            let key = pair_key(thread_id, replied_at)?;
            let mut pool = open_pool(cfg)?;
            let stat = OverrideLogic::restore(&mut pool, &key)?;
            success(format!("Restored {}", key));
            describe_day(&stat);
        }

        Commands::Whitelist {
            thread_id,
            replied_at,
            user,
            note,
            remove,
        } => {
            let key = pair_key(thread_id, replied_at)?;
            let mut pool = open_pool(cfg)?;

            if *remove {
                OverrideLogic::remove_whitelist(&mut pool, &key)?;
                success(format!("Removed whitelist entry {}", key));
            } else {
                let user = user
                    .as_deref()
                    .ok_or_else(|| AppError::Other("--user is required".into()))?;
                OverrideLogic::whitelist(&mut pool, user, &key, note)?;
                success(format!("Whitelisted {} for {}", key, user));
                info("Run `sync --backfill` to pick the pair up.");
            }
        }

        Commands::Overrides { user } => {
            let pool = open_pool(cfg)?;
            let user = user.as_ref().map(|u| u.trim().to_lowercase());

            let excluded = overrides::list_excluded(&pool.conn, user.as_deref())?;
            println!("🚫 Excluded pairs: {}", excluded.len());
            if !excluded.is_empty() {
                let mut table = Table::new(vec![
                    Column::new("Thread", 20),
                    Column::new("Replied at", 20),
                    Column::new("User", 26),
                    Column::new("From", 26),
                    Column::new("Reason", 30),
                ]);
                for e in &excluded {
                    table.add_row(vec![
                        e.pair.thread_id.clone(),
                        to_db_timestamp(&e.pair.replied_at),
                        e.pair.user_email.clone(),
                        e.pair.external_sender.clone(),
                        e.reason.clone(),
                    ]);
                }
                print!("{}", table.render(&cfg.separator_char));
            }

            let whitelisted = overrides::list_whitelisted(&pool.conn, user.as_deref())?;
            println!("\n✅ Whitelisted pairs: {}", whitelisted.len());
            if !whitelisted.is_empty() {
                let mut table = Table::new(vec![
                    Column::new("Thread", 20),
                    Column::new("Replied at", 20),
                    Column::new("User", 26),
                    Column::new("Note", 30),
                ]);
                for w in &whitelisted {
                    table.add_row(vec![
                        w.key.thread_id.clone(),
                        to_db_timestamp(&w.key.replied_at),
                        w.user_email.clone(),
                        w.note.clone(),
                    ]);
                }
                print!("{}", table.render(&cfg.separator_char));
            }
        }

        _ => {}
    }

    Ok(())
}
