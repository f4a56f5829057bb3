use crate::cli::commands::open_pool;
use crate::cli::parser::{Commands, OooAction};
use crate::config::Config;
use crate::db::log::ttlog;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::ooo::OooPeriod;
use crate::ui::messages::{success, warning};
use crate::utils::date::parse_date;
use crate::utils::table::{Column, Table};
use chrono::NaiveDate;

fn date_arg(s: &str) -> AppResult<NaiveDate> {
    parse_date(s.trim()).ok_or_else(|| AppError::InvalidDate(s.to_string()))
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Ooo { action } = cmd else {
        return Ok(());
    };

    let pool = open_pool(cfg)?;

    match action {
        OooAction::Add {
            email,
            start,
            end,
            description,
        } => {
            let user = queries::require_user(&pool.conn, email)?;
            let period = OooPeriod::new(date_arg(start)?, date_arg(end)?, description.clone())?;

            queries::upsert_ooo(&pool.conn, &user.email, &period)?;
            ttlog(
                &pool.conn,
                "ooo_add",
                &user.email,
                &format!("{}..{}", period.start_date, period.end_date),
            )?;
            success(format!(
                "Out of office for {}: {} → {}",
                user.email, period.start_date, period.end_date
            ));
        }

        OooAction::List { email } => {
            let user = queries::require_user(&pool.conn, email)?;
            let periods = queries::load_ooo(&pool.conn, &user.email)?;

            if periods.is_empty() {
                warning(format!("No out-of-office periods for {}", user.email));
                return Ok(());
            }

            let mut table = Table::new(vec![
                Column::new("Start", 10),
                Column::new("End", 10),
                Column::new("Days", 4),
                Column::new("Description", 40),
            ]);
            for p in &periods {
                table.add_row(vec![
                    p.start_date.to_string(),
                    p.end_date.to_string(),
                    ((p.end_date - p.start_date).num_days() + 1).to_string(),
                    p.description.clone().unwrap_or_default(),
                ]);
            }
            print!("{}", table.render(&cfg.separator_char));
        }

        OooAction::Del { email, start, end } => {
            let user = queries::require_user(&pool.conn, email)?;
            let (start, end) = (date_arg(start)?, date_arg(end)?);

            queries::delete_ooo(&pool.conn, &user.email, start, end)?;
            ttlog(&pool.conn, "ooo_del", &user.email, &format!("{}..{}", start, end))?;
            success(format!("Removed out-of-office {} → {} for {}", start, end, user.email));
        }
    }

    Ok(())
}
