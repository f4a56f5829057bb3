use crate::db::log::load_log;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use ansi_term::Colour;
use regex::Regex;
use std::sync::OnceLock;

const OP_WIDTH_LIMIT: usize = 60;

fn strip_ansi(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1B\[[0-9;]*[mK]").expect("static regex"))
        .replace_all(s, "")
        .into_owned()
}

/// ANSI colour for an audit operation
fn color_for_operation(op: &str) -> Colour {
    match op {
        "sync" => Colour::Green,
        "sync_failed" => Colour::Red,
        "exclude" | "unwhitelist" | "user_deactivate" | "ooo_del" => Colour::Yellow,
        "restore" | "whitelist" | "user_activate" => Colour::Cyan,
        "migration_applied" => Colour::Purple,
        "init" => Colour::RGB(255, 153, 51),
        other if other.starts_with("user_") || other.starts_with("ooo_") => Colour::Blue,
        _ => Colour::White,
    }
}

pub struct LogLogic;

impl LogLogic {
    pub fn print_log(pool: &mut DbPool) -> AppResult<()> {
        let entries = load_log(&pool.conn)?;

        if entries.is_empty() {
            println!("📜 Internal log is empty.");
            return Ok(());
        }

        let rows: Vec<(String, String, String, String)> = entries
            .into_iter()
            .map(|e| {
                let date = chrono::DateTime::parse_from_rfc3339(&e.date)
                    .map(|dt| dt.format("%FT%T%:z").to_string())
                    .unwrap_or(e.date);

                let op_target = if e.target.is_empty() {
                    e.operation.clone()
                } else {
                    format!("{} ({})", e.operation, e.target)
                };

                (date, e.operation, op_target, e.message)
            })
            .collect();

        let op_w = rows
            .iter()
            .map(|(_, _, op_target, _)| op_target.chars().count())
            .max()
            .unwrap_or(10)
            .min(OP_WIDTH_LIMIT);
        let date_w = rows.iter().map(|(d, _, _, _)| d.len()).max().unwrap_or(10);
        let id_w = rows.len().to_string().len();

        println!("📜 Internal log:\n");

        for (i, (date, operation, op_target, message)) in rows.into_iter().enumerate() {
            let color = color_for_operation(&operation);

            let visible = if op_target.chars().count() > OP_WIDTH_LIMIT {
                let mut s: String = op_target.chars().take(OP_WIDTH_LIMIT - 3).collect();
                s.push_str("...");
                s
            } else {
                op_target
            };

            // Only the operation word is coloured.
            let colored = match visible.split_once(' ') {
                Some((op_word, rest)) => format!("{} {}", color.paint(op_word), rest),
                None => color.paint(visible.as_str()).to_string(),
            };

            let padding = " ".repeat(op_w.saturating_sub(strip_ansi(&colored).chars().count()));

            println!(
                "{:>id_w$}: {:<date_w$} | {}{} => {}",
                i + 1,
                date,
                colored,
                padding,
                message,
                id_w = id_w,
                date_w = date_w
            );
        }

        Ok(())
    }
}
