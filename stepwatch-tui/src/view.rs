//! Immutable render snapshot and its two-pane text layout.

use console::{Alignment, measure_text_width, pad_str};
use stepwatch_activity::{LogLevel, ObservationEntry, ObservationRegistry};

use crate::components::{
    CONTINUATION, COLOR_SECONDARY, RowStatus, clock, format_elapsed, format_percentage,
    level_style, truncate_pad,
};
use crate::config::RendererConfig;

const STATUS_TITLE: &str = "Status";
const LOG_TITLE: &str = "Log";
/// Labels are not squeezed below this many columns to make room for messages.
const MIN_LABEL_WIDTH: usize = 12;

/// One line of the status pane.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRow {
    pub status: RowStatus,
    /// Description, or the name when the activity has none
    pub label: String,
    pub message: String,
    /// Percentage while running, elapsed time once finished
    pub trailing: String,
    pub failed: bool,
}

impl StatusRow {
    pub fn from_entry(entry: &ObservationEntry) -> Self {
        let trailing = match (entry.duration(), entry.last_progress) {
            (Some(elapsed), _) => format_elapsed(elapsed),
            (None, Some(progress)) if !entry.is_finished() => format_percentage(progress),
            _ => String::new(),
        };

        Self {
            status: RowStatus::of(entry),
            label: entry
                .description
                .clone()
                .unwrap_or_else(|| entry.name.clone()),
            message: single_line(entry.last_progress_message.as_deref().unwrap_or_default()),
            trailing,
            failed: entry.failed,
        }
    }
}

/// One line of the log pane.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    /// `HH:MM:SS` in local time
    pub time: String,
    pub level: LogLevel,
    pub message: String,
}

/// Everything one frame shows, captured at a single point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    /// In announce order
    pub rows: Vec<StatusRow>,
    /// Oldest first, newest at the bottom
    pub logs: Vec<LogLine>,
    pub frame: usize,
    pub message_width: usize,
}

impl RenderSnapshot {
    pub fn capture(registry: &ObservationRegistry, config: &RendererConfig, frame: usize) -> Self {
        let rows = registry
            .snapshot_ordered_by_announce_time()
            .iter()
            .map(StatusRow::from_entry)
            .collect();

        let mut logs: Vec<LogLine> = registry
            .latest_log_records()
            .take(config.log_tail)
            .map(|record| LogLine {
                time: clock(record.timestamp),
                level: record.level,
                message: single_line(&record.message),
            })
            .collect();
        logs.reverse();

        Self {
            rows,
            logs,
            frame,
            message_width: config.message_width,
        }
    }

    /// Lay the snapshot out as two framed panes side by side, `width` columns wide.
    pub fn render(&self, width: usize) -> Vec<String> {
        let left_width = width / 2;
        let right_width = width - left_width;
        let height = self.rows.len().max(self.logs.len()).max(1);

        let status = pane(
            STATUS_TITLE,
            &self.status_lines(pane_inner_width(left_width)),
            left_width,
            height,
        );
        let log = pane(LOG_TITLE, &self.log_lines(), right_width, height);

        status
            .into_iter()
            .zip(log)
            .map(|(left, right)| left + &right)
            .collect()
    }

    /// Status rows fitted into `width` columns.
    ///
    /// The trailing percentage or duration is always kept. When the row does
    /// not fit, the label gives way first, then the message column.
    fn status_lines(&self, width: usize) -> Vec<String> {
        let widest = |text: fn(&StatusRow) -> &str| {
            self.rows
                .iter()
                .map(|row| measure_text_width(text(row)))
                .max()
                .unwrap_or(0)
        };
        let trailing_width = widest(|row| row.trailing.as_str());
        let natural_label = widest(|row| row.label.as_str());

        // Icon plus the three separating spaces.
        let available = width.saturating_sub(trailing_width + 4);
        let label_width = natural_label.min(
            available
                .saturating_sub(self.message_width)
                .max(MIN_LABEL_WIDTH.min(natural_label)),
        );
        let message_width = self
            .message_width
            .min(available.saturating_sub(label_width));

        self.rows
            .iter()
            .map(|row| {
                let line = format!(
                    "{} {} {} {}",
                    row.status.icon(self.frame),
                    truncate_pad(&row.label, label_width),
                    truncate_pad(&row.message, message_width),
                    console::style(&row.trailing).fg(COLOR_SECONDARY),
                );
                line.trim_end().to_string()
            })
            .collect()
    }

    fn log_lines(&self) -> Vec<String> {
        self.logs
            .iter()
            .map(|log| format!("{}: {}", log.time, level_style(log.level).apply_to(&log.message)))
            .collect()
    }
}

/// Frame `content` in a titled border exactly `width` columns wide and
/// `height` content lines tall.
fn pane(title: &str, content: &[String], width: usize, height: usize) -> Vec<String> {
    let inner = pane_inner_width(width);
    let mut lines = Vec::with_capacity(height + 2);

    let head = format!("┌─ {title} ");
    let head_width = measure_text_width(&head);
    if head_width + 1 <= width {
        lines.push(format!("{head}{}┐", "─".repeat(width - head_width - 1)));
    } else {
        lines.push(format!("┌{}┐", "─".repeat(width.saturating_sub(2))));
    }

    for row in 0..height {
        let text = content.get(row).map(String::as_str).unwrap_or_default();
        lines.push(format!(
            "│ {} │",
            pad_str(text, inner, Alignment::Left, Some(CONTINUATION))
        ));
    }

    lines.push(format!("└{}┘", "─".repeat(width.saturating_sub(2))));
    lines
}

/// Columns left for content inside a pane's border and padding.
fn pane_inner_width(width: usize) -> usize {
    width.saturating_sub(4)
}

/// Collapse line breaks so one record never spans several rows.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use console::strip_ansi_codes;

    fn row(status: RowStatus, label: &str, message: &str, trailing: &str) -> StatusRow {
        StatusRow {
            status,
            label: label.to_string(),
            message: message.to_string(),
            trailing: trailing.to_string(),
            failed: false,
        }
    }

    fn plain(lines: Vec<String>) -> String {
        lines
            .iter()
            .map(|line| strip_ansi_codes(line).into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_two_pane_layout() {
        let snapshot = RenderSnapshot {
            rows: vec![
                row(RowStatus::Finished, "git state", "done", "1.5s"),
                row(RowStatus::Running, "build", "compiling crates", "40%"),
                row(RowStatus::Pending, "lint", "", ""),
            ],
            logs: vec![
                LogLine {
                    time: "10:00:01".into(),
                    level: LogLevel::Information,
                    message: "clean tree".into(),
                },
                LogLine {
                    time: "10:00:02".into(),
                    level: LogLevel::Warning,
                    message: "slow disk".into(),
                },
            ],
            frame: 0,
            message_width: 10,
        };

        insta::assert_snapshot!(plain(snapshot.render(80)), @r"
        ┌─ Status ─────────────────────────────┐┌─ Log ────────────────────────────────┐
        │ ✔ git state done       1.5s          ││ 10:00:01: clean tree                 │
        │ ⠋ build     compilin.. 40%           ││ 10:00:02: slow disk                  │
        │ ○ lint                               ││                                      │
        └──────────────────────────────────────┘└──────────────────────────────────────┘
        ");
    }

    #[test]
    fn test_every_line_has_the_requested_width() {
        let snapshot = RenderSnapshot {
            rows: vec![row(
                RowStatus::Running,
                "a very long description that will not fit",
                "and a message that is longer than the column",
                "99%",
            )],
            logs: Vec::new(),
            frame: 7,
            message_width: 50,
        };

        for width in [20, 41, 80, 123] {
            for line in snapshot.render(width) {
                assert_eq!(measure_text_width(&line), width, "{line:?}");
            }
        }
    }

    #[test]
    fn test_trailing_column_survives_common_widths() {
        let snapshot = RenderSnapshot {
            rows: vec![
                row(RowStatus::Running, "Checking git state", "halfway", "50%"),
                row(RowStatus::Finished, "Resolving next version", "done", "12.3s"),
            ],
            logs: Vec::new(),
            frame: 0,
            message_width: 50,
        };

        for width in [80, 100, 120] {
            let text = plain(snapshot.render(width));
            assert!(text.contains(" 50% "), "{width}:\n{text}");
            assert!(text.contains(" 12.3s "), "{width}:\n{text}");
        }

        let text = plain(snapshot.render(100));
        let expected = format!("│ ⠋ Checking g.. {:<25} 50%", "halfway");
        assert!(text.contains(&expected), "{text}");
    }

    #[test]
    fn test_wide_pane_keeps_full_label_and_message_width() {
        let snapshot = RenderSnapshot {
            rows: vec![row(RowStatus::Running, "Checking git state", "halfway", "50%")],
            logs: Vec::new(),
            frame: 0,
            message_width: 50,
        };

        let text = plain(snapshot.render(200));
        let expected = format!("│ ⠋ Checking git state {:<50} 50%", "halfway");
        assert!(text.contains(&expected), "{text}");
    }

    #[test]
    fn test_narrow_pane_squeezes_label_before_message() {
        let snapshot = RenderSnapshot {
            rows: vec![row(
                RowStatus::Running,
                "Building release artifacts for every target",
                "compiling",
                "40%",
            )],
            logs: Vec::new(),
            frame: 0,
            message_width: 50,
        };

        // 36 columns inside the pane: 12 for the label, 17 for the message.
        let text = plain(snapshot.render(80));
        let expected = format!("│ ⠋ Building r.. {:<17} 40% │", "compiling");
        assert!(text.contains(&expected), "{text}");
    }

    #[test]
    fn test_empty_snapshot_still_draws_frames() {
        let snapshot = RenderSnapshot {
            rows: Vec::new(),
            logs: Vec::new(),
            frame: 0,
            message_width: 50,
        };
        assert_eq!(snapshot.render(40).len(), 3);
    }

    #[test]
    fn test_capture_reads_registry() {
        let registry = ObservationRegistry::new();
        let config = RendererConfig::default().log_tail(2);

        let pending = registry.announce("pending", None).unwrap();
        let running = registry.start("running", Some("Compiling")).unwrap();
        running.report(0.25, Some("line one\nline two"));
        for n in 0..5 {
            running.log(LogLevel::Stdout, format!("log {n}"));
        }
        let done = registry.start("done", None).unwrap();
        done.fail();
        done.stop();

        let snapshot = RenderSnapshot::capture(&registry, &config, 4);

        let labels: Vec<&str> = snapshot.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["pending", "Compiling", "done"]);
        assert_eq!(snapshot.rows[0].status, RowStatus::Pending);
        assert_eq!(snapshot.rows[1].status, RowStatus::Running);
        assert_eq!(snapshot.rows[1].message, "line one line two");
        assert_eq!(snapshot.rows[1].trailing, "25%");
        assert_eq!(snapshot.rows[2].status, RowStatus::Finished);
        assert!(snapshot.rows[2].trailing.ends_with('s'));
        assert!(snapshot.rows[2].failed);

        let messages: Vec<&str> = snapshot.logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["log 3", "log 4"]);

        drop(pending);
    }

    #[test]
    fn test_failed_row_keeps_lifecycle_icon() {
        let mut failed = row(RowStatus::Running, "deploy", "", "");
        failed.failed = true;
        let healthy = row(RowStatus::Running, "deploy", "", "");

        let render = |row: StatusRow| {
            RenderSnapshot {
                rows: vec![row],
                logs: Vec::new(),
                frame: 2,
                message_width: 10,
            }
            .render(60)
        };

        assert_eq!(render(failed), render(healthy));
    }
}
