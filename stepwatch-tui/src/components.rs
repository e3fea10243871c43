//! Styling primitives shared by the live view and the console log lines

use std::time::Duration;

use chrono::{DateTime, Local};
use console::{Alignment, Color, Style, pad_str};
use stepwatch_activity::{LogLevel, ObservationEntry, Timestamp};

/// Spinner animation frames (braille dots pattern)
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Appended to text cut at a column boundary
pub const CONTINUATION: &str = "..";

pub const COLOR_PENDING: Color = Color::Color256(242);
pub const COLOR_ACTIVE: Color = Color::Yellow;
pub const COLOR_COMPLETED: Color = Color::Green;
pub const COLOR_SECONDARY: Color = Color::Color256(242);

pub fn spinner_frame(frame: usize) -> &'static str {
    SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
}

/// Where an activity is in its lifecycle, as far as the status column cares.
///
/// The failed flag is deliberately not part of this: a failed step keeps the
/// icon of its lifecycle position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Pending,
    Running,
    Finished,
}

impl RowStatus {
    pub fn of(entry: &ObservationEntry) -> Self {
        if !entry.is_started() {
            RowStatus::Pending
        } else if !entry.is_finished() {
            RowStatus::Running
        } else {
            RowStatus::Finished
        }
    }

    /// Styled icon for this status at the given spinner frame.
    pub fn icon(self, frame: usize) -> String {
        match self {
            RowStatus::Pending => Style::new().fg(COLOR_PENDING).apply_to("○").to_string(),
            RowStatus::Running => Style::new()
                .fg(COLOR_ACTIVE)
                .apply_to(spinner_frame(frame))
                .to_string(),
            RowStatus::Finished => Style::new().fg(COLOR_COMPLETED).apply_to("✔").to_string(),
        }
    }
}

/// Cut `text` to `width` columns, marking the cut with [`CONTINUATION`],
/// then right-pad to exactly `width` columns.
pub fn truncate_pad(text: &str, width: usize) -> String {
    pad_str(text, width, Alignment::Left, Some(CONTINUATION)).into_owned()
}

/// Whole percentage, rounded half away from zero.
pub fn format_percentage(progress: f64) -> String {
    format!("{}%", (progress * 100.0).round() as u32)
}

pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Local wall-clock time as `HH:MM:SS`.
pub fn clock(timestamp: Timestamp) -> String {
    DateTime::<Local>::from(timestamp.0)
        .format("%H:%M:%S")
        .to_string()
}

pub fn level_icon(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "…",
        LogLevel::Information => "ℹ",
        LogLevel::Success => "✓",
        LogLevel::Warning => "⚠",
        LogLevel::Error => "✗",
        LogLevel::Stdout | LogLevel::Stderr => "•",
    }
}

pub fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Debug => Color::Color256(242),
        LogLevel::Success => Color::Green,
        LogLevel::Warning => Color::Yellow,
        LogLevel::Error => Color::Red,
        LogLevel::Information | LogLevel::Stdout | LogLevel::Stderr => Color::White,
    }
}

pub fn level_style(level: LogLevel) -> Style {
    Style::new().fg(level_color(level))
}
