/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";

pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Response time colour:
/// <= 4h → green
/// <= 24h → yellow
/// otherwise → red
pub fn color_for_hours(hours: Option<f64>) -> &'static str {
    match hours {
        None => GREY,
        Some(h) if h <= 4.0 => GREEN,
        Some(h) if h <= 24.0 => YELLOW,
        Some(_) => RED,
    }
}

/// Wrap an optional, already formatted value: grey when missing (`--`).
pub fn colorize_optional(value: &str) -> String {
    if value.trim().is_empty() || value.trim() == "--" {
        format!("{GREY}{value}{RESET}")
    } else {
        value.to_string()
    }
}
