use crate::cli::commands::{open_pool, period_or_current_month};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::report::ReportLogic;
use crate::db::queries;
use crate::errors::AppResult;
use crate::ui::messages::warning;
use crate::utils::colors::{RESET, color_for_hours};
use crate::utils::table::{Column, Table};
use crate::utils::time::{format_hours, parse_timezone, to_db_timestamp};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Pairs { user, period } = cmd else {
        return Ok(());
    };

    let pool = open_pool(cfg)?;
    let (from, to) = period_or_current_month(period)?;

    // Dates are read in the user's timezone, or the default one for everybody.
    let (user_email, tz) = match user {
        Some(u) => {
            let u = queries::require_user(&pool.conn, u)?;
            (Some(u.email), u.schedule.timezone)
        }
        None => (None, parse_timezone(&cfg.default_timezone)?),
    };

    let pairs = ReportLogic::pairs(&pool, user_email.as_deref(), &tz, from, to)?;
    if pairs.is_empty() {
        warning(format!("No response pairs between {} and {}", from, to));
        return Ok(());
    }

    let mut table = Table::new(vec![
        Column::new("Replied (local)", 16),
        Column::new("User", 26),
        Column::new("From", 26),
        Column::new("Subject", 28),
        Column::new("Raw", 6),
        Column::new("Adj", 6),
        Column::new("Key (thread replied_at)", 44),
    ]);

    for p in &pairs {
        table.add_row(vec![
            p.replied_at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string(),
            p.user_email.clone(),
            p.external_sender.clone(),
            p.subject.clone(),
            format_hours(p.response_hours),
            format_hours(p.adjusted_response_hours),
            format!("{} {}", p.thread_id, to_db_timestamp(&p.replied_at)),
        ]);
    }

    let rendered = table.render(&cfg.separator_char);
    for (i, line) in rendered.lines().enumerate() {
        match i.checked_sub(2).and_then(|r| pairs.get(r)) {
            Some(p) => println!(
                "{}{}{}",
                color_for_hours(Some(p.adjusted_response_hours)),
                line,
                RESET
            ),
            None => println!("{line}"),
        }
    }
    println!("\n{} pair(s), {} → {}", pairs.len(), from, to);

    Ok(())
}
