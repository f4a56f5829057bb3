use crate::cli::commands::open_pool;
use crate::cli::parser::{Commands, ScheduleArgs, UserAction};
use crate::config::Config;
use crate::db::log::ttlog;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::user::{TrackedUser, WorkSchedule};
use crate::ui::messages::{success, warning};
use crate::utils::colors::RESET;
use crate::utils::formatting::describe_active;
use crate::utils::table::{Column, Table};
use crate::utils::time::{parse_time_arg, parse_timezone, to_db_timestamp};

/// Apply the optional flags on top of an existing schedule and profile.
fn apply_args(user: &mut TrackedUser, args: &ScheduleArgs) -> AppResult<()> {
    if let Some(name) = &args.name {
        user.name = name.trim().to_string();
    }
    if let Some(f) = &args.team_function {
        user.team_function = f.trim().to_string();
    }
    if let Some(s) = &args.start {
        user.schedule.work_start = parse_time_arg(s)?;
    }
    if let Some(e) = &args.end {
        user.schedule.work_end = parse_time_arg(e)?;
    }
    if let Some(tz) = &args.tz {
        user.schedule.timezone = parse_timezone(tz)?;
    }
    Ok(())
}

fn warn_empty_window(schedule: &WorkSchedule) {
    if schedule.is_empty_window() {
        warning(format!(
            "Working window {}–{} is empty: adjusted hours will always be 0.",
            schedule.work_start.format("%H:%M"),
            schedule.work_end.format("%H:%M")
        ));
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::User { action } = cmd else {
        return Ok(());
    };

    let pool = open_pool(cfg)?;

    match action {
        UserAction::Add {
            email,
            schedule,
            include_weekends,
        } => {
            if queries::load_user(&pool.conn, email)?.is_some() {
                return Err(AppError::UserExists(email.to_string()));
            }

            let mut user = TrackedUser::new(email, cfg.default_schedule()?)?;
            apply_args(&mut user, schedule)?;
            user.schedule.exclude_weekends = !*include_weekends;
            warn_empty_window(&user.schedule);

            queries::upsert_user(&pool.conn, &user)?;
            ttlog(&pool.conn, "user_add", &user.email, "tracking started")?;
            success(format!("Now tracking {}", user.email));
        }

        UserAction::Edit {
            email,
            schedule,
            include_weekends,
            exclude_weekends,
        } => {
            let mut user = queries::require_user(&pool.conn, email)?;
            apply_args(&mut user, schedule)?;
            if *include_weekends {
                user.schedule.exclude_weekends = false;
            }
            if *exclude_weekends {
                user.schedule.exclude_weekends = true;
            }
            warn_empty_window(&user.schedule);

            queries::upsert_user(&pool.conn, &user)?;
            ttlog(&pool.conn, "user_edit", &user.email, "profile updated")?;
            success(format!("Updated {}", user.email));
        }

        UserAction::List { all } => {
            let users = queries::list_users(&pool.conn, *all)?;
            if users.is_empty() {
                warning("No tracked users. Add one with `user add <email>`.");
                return Ok(());
            }

            let mut table = Table::new(vec![
                Column::new("Email", 32),
                Column::new("Name", 16),
                Column::new("Function", 12),
                Column::new("Hours", 11),
                Column::new("Timezone", 20),
                Column::new("Wkend", 5),
                Column::new("Status", 8),
                Column::new("Last sync", 20),
            ]);

            for u in &users {
                table.add_row(vec![
                    u.email.clone(),
                    u.name.clone(),
                    u.team_function.clone(),
                    format!(
                        "{}-{}",
                        u.schedule.work_start.format("%H:%M"),
                        u.schedule.work_end.format("%H:%M")
                    ),
                    u.schedule.timezone.name().to_string(),
                    if u.schedule.exclude_weekends { "off" } else { "on" }.to_string(),
                    describe_active(u.is_active).0.to_string(),
                    u.last_synced_at
                        .as_ref()
                        .map(to_db_timestamp)
                        .unwrap_or_else(|| "never".into()),
                ]);
            }

            let rendered = table.render(&cfg.separator_char);
            for (i, line) in rendered.lines().enumerate() {
                match i.checked_sub(2).and_then(|r| users.get(r)) {
                    Some(u) => {
                        let (_, color) = describe_active(u.is_active);
                        println!("{color}{line}{RESET}");
                    }
                    None => println!("{line}"),
                }
            }
        }

        UserAction::Deactivate { email } => {
            queries::set_active(&pool.conn, email, false)?;
            ttlog(&pool.conn, "user_deactivate", email, "sync disabled")?;
            success(format!("{} deactivated", email));
        }

        UserAction::Activate { email } => {
            queries::set_active(&pool.conn, email, true)?;
            ttlog(&pool.conn, "user_activate", email, "sync enabled")?;
            success(format!("{} activated", email));
        }
    }

    Ok(())
}
