//! Read-facing records aggregated by the registry.

use std::time::Duration;

use crate::Timestamp;
use crate::events::{ActivityId, LogLevel};

/// One progress report as it was received
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub timestamp: Timestamp,
    pub value: f64,
    pub message: Option<String>,
}

/// One log line attached to an activity
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// The activity that logged this line
    pub activity: ActivityId,
    pub timestamp: Timestamp,
    pub level: LogLevel,
    pub message: String,
    /// Registry-wide arrival order, used to break timestamp ties
    pub(crate) seq: u64,
}

/// Aggregated state of one activity, owned by the registry.
///
/// Values handed out by the registry are point-in-time copies.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationEntry {
    pub id: ActivityId,
    pub name: String,
    pub description: Option<String>,
    pub announced_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub last_progress: Option<f64>,
    pub last_progress_message: Option<String>,
    /// Every progress report, oldest first
    pub progress: Vec<ProgressRecord>,
    /// Every log line, oldest first
    pub logs: Vec<LogRecord>,
    /// Mirrors [`Activity::is_failed`](crate::Activity::is_failed) at copy time
    pub failed: bool,
}

impl ObservationEntry {
    pub(crate) fn new(
        id: ActivityId,
        name: String,
        description: Option<String>,
        announced_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            description,
            announced_at,
            started_at: None,
            ended_at: None,
            last_progress: None,
            last_progress_message: None,
            progress: Vec::new(),
            logs: Vec::new(),
            failed: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Time between start and end, once both are known
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end.since(start)),
            _ => None,
        }
    }
}
