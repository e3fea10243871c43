//! Activity event types for the stepwatch activity tracking system.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Timestamp;

static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one activity.
///
/// Issued from a process-wide counter when the activity is created, so two
/// activities sharing a name still have distinct identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(u64);

impl ActivityId {
    pub(crate) fn next() -> Self {
        Self(ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events raised by an [`Activity`](crate::Activity) to its subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ActivityEvent {
    Started {
        id: ActivityId,
        timestamp: Timestamp,
    },
    Progress {
        id: ActivityId,
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        timestamp: Timestamp,
    },
    Log {
        id: ActivityId,
        level: LogLevel,
        message: String,
        timestamp: Timestamp,
    },
    Stopped {
        id: ActivityId,
        timestamp: Timestamp,
    },
}

impl ActivityEvent {
    /// The activity that raised this event
    pub fn id(&self) -> ActivityId {
        match self {
            ActivityEvent::Started { id, .. }
            | ActivityEvent::Progress { id, .. }
            | ActivityEvent::Log { id, .. }
            | ActivityEvent::Stopped { id, .. } => *id,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            ActivityEvent::Started { timestamp, .. }
            | ActivityEvent::Progress { timestamp, .. }
            | ActivityEvent::Log { timestamp, .. }
            | ActivityEvent::Stopped { timestamp, .. } => *timestamp,
        }
    }
}

/// Severity of a log line attached to an activity, ordered from least to most severe.
///
/// `Stdout` and `Stderr` carry captured output of external commands.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    strum::EnumString,
    strum::Display,
    serde_with::DeserializeFromStr,
    serde_with::SerializeDisplay,
)]
#[strum(serialize_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Stdout,
    #[default]
    Information,
    Success,
    Warning,
    Stderr,
    Error,
}
