use crate::cli::commands::{open_pool, period_or_current_month};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::report::{ReportLogic, TeamOverview};
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::AppResult;
use crate::models::daily_stat::Summary;
use crate::ui::messages::{header, warning};
use crate::utils::colors::{CYAN, GREEN, RED, RESET, color_for_hours, colorize_optional};
use crate::utils::table::{Column, Table};
use crate::utils::time::{format_hours, format_opt_hours, parse_timezone};
use chrono::NaiveDate;

fn summary_line(label: &str, s: Option<Summary>) {
    let avg = s.map(|x| x.avg);
    println!(
        "{CYAN}• {label}:{RESET} avg {}{}{RESET} · median {} · min {} · max {}",
        color_for_hours(avg),
        format_opt_hours(avg),
        colorize_optional(&format_opt_hours(s.map(|x| x.median))),
        colorize_optional(&format_opt_hours(s.map(|x| x.min))),
        colorize_optional(&format_opt_hours(s.map(|x| x.max))),
    );
}

/// Team view: one ranked row per user, fastest median first.
fn print_overview(overview: &TeamOverview, cfg: &Config, from: NaiveDate, to: NaiveDate) {
    header(format!("Team summary {} → {}", from, to));

    println!(
        "{CYAN}• Team median:{RESET} {} · {CYAN}team avg:{RESET} {}",
        format_opt_hours(overview.team_median),
        format_opt_hours(overview.team_avg)
    );
    println!(
        "{CYAN}• Responses tracked:{RESET} {} · received {} · sent {}\n",
        overview.response_pairs, overview.emails_received, overview.emails_sent
    );

    let mut table = Table::new(vec![
        Column::new("#", 3),
        Column::new("User", 30),
        Column::new("Median", 6),
        Column::new("Avg", 6),
        Column::new("Adj med", 7),
        Column::new("Pairs", 5),
        Column::new("Recv", 5),
        Column::new("Sent", 5),
        Column::new("vs team", 8),
    ]);

    for (i, u) in overview.users.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            u.user_email.clone(),
            format_opt_hours(u.raw.map(|s| s.median)),
            format_opt_hours(u.raw.map(|s| s.avg)),
            format_opt_hours(u.adjusted.map(|s| s.median)),
            u.response_pairs.to_string(),
            u.emails_received.to_string(),
            u.emails_sent.to_string(),
            u.vs_team(overview).map(signed_hours).unwrap_or_else(|| "--".into()),
        ]);
    }

    let rendered = table.render(&cfg.separator_char);
    for (i, line) in rendered.lines().enumerate() {
        match i.checked_sub(2).and_then(|r| overview.users.get(r)) {
            Some(u) => println!(
                "{}{}{}",
                color_for_hours(u.raw.map(|s| s.median)),
                line,
                RESET
            ),
            None => println!("{line}"),
        }
    }
}

fn signed_hours(delta: f64) -> String {
    if delta < 0.0 {
        format!("-{}", format_hours(-delta))
    } else {
        format!("+{}", format_hours(delta))
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Stats { user, period } = cmd else {
        return Ok(());
    };

    let pool = open_pool(cfg)?;
    let (from, to) = period_or_current_month(period)?;

    match user {
        None => {
            let tz = parse_timezone(&cfg.default_timezone)?;
            let overview = ReportLogic::overview(&pool, &tz, from, to)?;
            if overview.users.is_empty() {
                warning(format!("No daily statistics between {} and {}", from, to));
                return Ok(());
            }
            print_overview(&overview, cfg, from, to);
            Ok(())
        }
        Some(u) => user_detail(&pool, cfg, u, from, to),
    }
}

fn user_detail(pool: &DbPool, cfg: &Config, email: &str, from: NaiveDate, to: NaiveDate) -> AppResult<()> {
    let user = queries::require_user(&pool.conn, email)?;
    let tz = user.schedule.timezone;

    let (days, summary) = ReportLogic::stats(pool, Some(&user.email), &tz, from, to)?;

    if days.is_empty() {
        warning(format!("No daily statistics between {} and {}", from, to));
        return Ok(());
    }

    header(format!("Response times of {} {} → {}", user.email, from, to));

    let mut table = Table::new(vec![
        Column::new("Date", 10),
        Column::new("Recv", 5),
        Column::new("Sent", 5),
        Column::new("Pairs", 5),
        Column::new("Avg", 6),
        Column::new("Median", 6),
        Column::new("Adj avg", 7),
        Column::new("Adj med", 7),
    ]);

    for d in &days {
        table.add_row(vec![
            d.date.to_string(),
            d.emails_received.to_string(),
            d.emails_sent.to_string(),
            d.response_pairs_count.to_string(),
            format_opt_hours(d.raw.map(|s| s.avg)),
            format_opt_hours(d.raw.map(|s| s.median)),
            format_opt_hours(d.adjusted.map(|s| s.avg)),
            format_opt_hours(d.adjusted.map(|s| s.median)),
        ]);
    }
    print!("{}", table.render(&cfg.separator_char));

    println!();
    println!(
        "{CYAN}• Days:{RESET} {} · received {} · sent {} · pairs {}",
        summary.days, summary.emails_received, summary.emails_sent, summary.response_pairs
    );
    summary_line("Raw", summary.raw);
    summary_line("Working hours", summary.adjusted);

    // Team figures use the default timezone for the period bounds.
    let team_tz = parse_timezone(&cfg.default_timezone)?;
    let overview = ReportLogic::overview(pool, &team_tz, from, to)?;
    if let Some(delta) = overview.user(&user.email).and_then(|u| u.vs_team(&overview)) {
        let color = if delta <= 0.0 { GREEN } else { RED };
        println!(
            "{CYAN}• Compared to team avg {}:{RESET} {color}{}{RESET}",
            format_opt_hours(overview.team_avg),
            signed_hours(delta)
        );
    }

    Ok(())
}
