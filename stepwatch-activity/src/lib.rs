//! Activity tracking for long-running, multi-step workflows.
//!
//! This crate provides:
//! - [`Activity`], a thread-safe handle for one step (start, report, log, stop, fail)
//! - [`ObservationRegistry`], the shared store that folds every activity's
//!   events into an [`ObservationEntry`] and re-broadcasts them as [`RegistryEvent`]s
//!
//! ## Usage
//!
//! ```
//! use stepwatch_activity::{LogLevel, ObservationRegistry};
//!
//! let registry = ObservationRegistry::new();
//! let git = registry.announce("git", Some("Checking git state")).unwrap();
//!
//! git.start();
//! git.report(0.5, Some("halfway"));
//! git.log(LogLevel::Information, "working tree clean");
//! git.stop_with("done");
//!
//! let entry = registry.entry(git.id()).unwrap();
//! assert_eq!(entry.last_progress, Some(1.0));
//! assert_eq!(entry.last_progress_message.as_deref(), Some("done"));
//! ```

mod activity;
mod entry;
mod error;
mod events;
mod hub;
mod registry;
mod timestamp;

pub use activity::{Activity, Lifecycle};
pub use entry::{LogRecord, ObservationEntry, ProgressRecord};
pub use error::{ActivityError, ActivityResult};
pub use events::{ActivityEvent, ActivityId, LogLevel};
pub use hub::{ActivityObserver, SubscriptionId};
pub use registry::{DEFAULT_NOTIFICATION_CAPACITY, ObservationRegistry, RegistryEvent};
pub use timestamp::Timestamp;

// Re-exported so consumers can name the notification receiver type.
pub use tokio::sync::broadcast;
