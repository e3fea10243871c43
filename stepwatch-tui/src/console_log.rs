//! One-line console formatting of activity lifecycle and log notifications.
//!
//! Every line starts with the local `[HH:MM:SS]` time of the notification.

use std::time::Duration;

use console::style;
use stepwatch_activity::{LogLevel, Timestamp};

use crate::components::{
    COLOR_SECONDARY, clock, format_elapsed, format_percentage, level_icon, level_style,
};

fn stamp(at: Timestamp) -> String {
    style(format!("[{}]", clock(at)))
        .fg(COLOR_SECONDARY)
        .to_string()
}

pub fn step_started(at: Timestamp, description: &str) -> String {
    format!(
        "{} {} Starting: {description}",
        stamp(at),
        style("▶").yellow()
    )
}

pub fn step_completed(at: Timestamp, description: &str, elapsed: Duration) -> String {
    format!(
        "{} {} Completed: {description} {}",
        stamp(at),
        style("✓").green(),
        style(format!("({})", format_elapsed(elapsed))).fg(COLOR_SECONDARY)
    )
}

/// `None` for progress at or below zero, which is not worth a line.
pub fn progress(
    at: Timestamp,
    description: &str,
    value: f64,
    message: Option<&str>,
) -> Option<String> {
    if value <= 0.0 {
        return None;
    }

    let info = match message.filter(|m| !m.is_empty()) {
        Some(message) => format!("{} - {message}", format_percentage(value)),
        None => format_percentage(value),
    };
    Some(format!(
        "{} {} Progress: {description} {}",
        stamp(at),
        style("↻").blue(),
        style(info).yellow()
    ))
}

pub fn message(at: Timestamp, description: &str, level: LogLevel, message: &str) -> String {
    let level_style = level_style(level);
    format!(
        "{} {} {description}: {}",
        stamp(at),
        level_style.apply_to(level_icon(level)),
        level_style.apply_to(message)
    )
}
