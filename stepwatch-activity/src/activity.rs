//! Activity handle that tracks one step's lifecycle, progress and log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{Level, Span, span};

use crate::Timestamp;
use crate::error::{ActivityError, ActivityResult};
use crate::events::{ActivityEvent, ActivityId, LogLevel};
use crate::hub::{ActivityObserver, Subscribers, SubscriptionId};

/// Lifecycle position of an activity.
///
/// `Failed` is tracked separately and can be set in any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Unstarted,
    Running,
    Stopped,
}

#[derive(Debug, Default)]
struct ActivityState {
    lifecycle: Lifecycle,
    ever_started: bool,
    progress: f64,
    message: Option<String>,
}

impl ActivityState {
    fn set_progress(&mut self, value: f64) {
        // NaN compares false both ways; treat it as no progress.
        self.progress = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };
    }

    fn set_message(&mut self, message: Option<&str>) {
        if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
            self.message = Some(message.to_string());
        }
    }

    fn progress_event(&self, id: ActivityId) -> ActivityEvent {
        ActivityEvent::Progress {
            id,
            value: self.progress,
            message: self.message.clone(),
            timestamp: Timestamp::now(),
        }
    }
}

/// Handle for one tracked step of a workflow.
///
/// All methods take `&self` and are safe to call from any thread; share the
/// handle with `Arc<Activity>` when several workers report on the same step.
/// None of the lifecycle methods fail or panic.
///
/// Dropping a started activity stops it, once.
#[must_use = "Activity will stop immediately if dropped"]
pub struct Activity {
    id: ActivityId,
    name: String,
    description: Option<String>,
    span: Span,
    state: Mutex<ActivityState>,
    /// Serializes delivery so observers see one activity's events in order.
    emitting: Mutex<()>,
    failed: Arc<AtomicBool>,
    disposed: AtomicBool,
    subscribers: Arc<Subscribers>,
}

impl Activity {
    /// Create an unstarted activity.
    ///
    /// Fails with [`ActivityError::InvalidArgument`] when `name` is empty or whitespace.
    pub fn new(name: impl Into<String>, description: Option<String>) -> ActivityResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ActivityError::invalid_argument(
                "activity name must not be empty",
            ));
        }

        let id = ActivityId::next();
        let span = span!(Level::TRACE, "activity", activity_id = id.as_u64(), name = %name);

        Ok(Self {
            id,
            name,
            description,
            span,
            state: Mutex::new(ActivityState::default()),
            emitting: Mutex::new(()),
            failed: Arc::new(AtomicBool::new(false)),
            disposed: AtomicBool::new(false),
            subscribers: Arc::new(Subscribers::default()),
        })
    }

    /// Get the activity ID
    pub fn id(&self) -> ActivityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Get a cloned span for this activity.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lock_state().lifecycle
    }

    /// Last stored progress, always within `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.lock_state().progress
    }

    pub fn message(&self) -> Option<String> {
        self.lock_state().message.clone()
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Register an observer for this activity's events.
    pub fn subscribe(&self, observer: Arc<dyn ActivityObserver>) -> SubscriptionId {
        self.subscribers.subscribe(observer)
    }

    /// Remove an observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(subscription)
    }

    /// Start the activity. No-op if it was already started or stopped.
    pub fn start(&self) {
        self.start_inner(None);
    }

    /// Start the activity and report `message` as its first progress message.
    pub fn start_with(&self, message: impl AsRef<str>) {
        self.start_inner(Some(message.as_ref()));
    }

    fn start_inner(&self, message: Option<&str>) {
        self.transition(|state| {
            if state.lifecycle != Lifecycle::Unstarted {
                return Vec::new();
            }

            state.lifecycle = Lifecycle::Running;
            state.ever_started = true;
            let mut events = Vec::with_capacity(2);
            if message.is_some() {
                state.set_message(message);
                events.push(state.progress_event(self.id));
            }
            events.push(ActivityEvent::Started {
                id: self.id,
                timestamp: Timestamp::now(),
            });
            events
        });
    }

    /// Report progress, clamped into `[0, 1]`.
    ///
    /// An absent or blank message keeps the previous one. The event is raised
    /// even when nothing changed; lower values than before are accepted.
    pub fn report(&self, value: f64, message: Option<&str>) {
        self.transition(|state| {
            state.set_progress(value);
            state.set_message(message);
            vec![state.progress_event(self.id)]
        });
    }

    /// Update only the progress message, keeping the last value.
    pub fn report_message(&self, message: impl AsRef<str>) {
        self.transition(|state| {
            state.set_message(Some(message.as_ref()));
            vec![state.progress_event(self.id)]
        });
    }

    /// Attach a log line. Allowed at any point of the lifecycle.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        self.transition(|_| {
            vec![ActivityEvent::Log {
                id: self.id,
                level,
                message,
                timestamp: Timestamp::now(),
            }]
        });
    }

    /// Stop the activity, forcing progress to 1.
    ///
    /// Every call raises a Progress event followed by a Stopped event, even if
    /// the activity was already stopped or never started.
    pub fn stop(&self) {
        self.stop_inner(None);
    }

    /// Stop the activity with a final progress message.
    pub fn stop_with(&self, message: impl AsRef<str>) {
        self.stop_inner(Some(message.as_ref()));
    }

    fn stop_inner(&self, message: Option<&str>) {
        self.transition(|state| {
            state.set_progress(1.0);
            state.set_message(message);
            state.lifecycle = Lifecycle::Stopped;
            vec![
                state.progress_event(self.id),
                ActivityEvent::Stopped {
                    id: self.id,
                    timestamp: Timestamp::now(),
                },
            ]
        });
    }

    /// Apply `change` under the state lock, then deliver the events it
    /// produced with the state lock released.
    fn transition<F>(&self, change: F)
    where
        F: FnOnce(&mut ActivityState) -> Vec<ActivityEvent>,
    {
        let _guard = self.span.enter();
        let _emitting = self.emitting.lock().unwrap_or_else(PoisonError::into_inner);
        let events = change(&mut self.lock_state());
        for event in events {
            self.subscribers.emit(event);
        }
    }

    /// Mark as failed. Raises no event and leaves the lifecycle untouched.
    pub fn fail(&self) {
        self.failed.store(true, Ordering::Release);
    }

    /// Release the activity: stops it once if it was ever started.
    ///
    /// An activity that was only stopped, never started, is left alone.
    /// Repeated calls, and the implicit call on drop, do nothing further.
    pub fn dispose(&self) {
        if !self.lock_state().ever_started {
            return;
        }
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop();
    }

    pub(crate) fn subscribers(&self) -> Arc<Subscribers> {
        Arc::clone(&self.subscribers)
    }

    pub(crate) fn failed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failed)
    }

    fn lock_state(&self) -> MutexGuard<'_, ActivityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("state", &*self.lock_state())
            .field("failed", &self.is_failed())
            .finish()
    }
}

impl Drop for Activity {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Collects every event raised by an activity.
    fn record(activity: &Activity) -> Arc<Mutex<Vec<ActivityEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        activity.subscribe(Arc::new({
            let events = events.clone();
            move |event: &ActivityEvent| events.lock().unwrap().push(event.clone())
        }));
        events
    }

    fn kinds(events: &Mutex<Vec<ActivityEvent>>) -> Vec<&'static str> {
        events
            .lock()
            .unwrap()
            .iter()
            .map(|event| match event {
                ActivityEvent::Started { .. } => "started",
                ActivityEvent::Progress { .. } => "progress",
                ActivityEvent::Log { .. } => "log",
                ActivityEvent::Stopped { .. } => "stopped",
            })
            .collect()
    }

    #[test]
    fn test_rejects_blank_names() {
        assert!(matches!(
            Activity::new("", None),
            Err(ActivityError::InvalidArgument(_))
        ));
        assert!(matches!(
            Activity::new("  \t", None),
            Err(ActivityError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_same_name_gets_distinct_ids() {
        let a = Activity::new("build", None).unwrap();
        let b = Activity::new("build", None).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_report_clamps_both_directions() {
        let activity = Activity::new("clamp", None).unwrap();

        activity.report(-0.5, None);
        assert_eq!(activity.progress(), 0.0);

        activity.report(1.5, None);
        assert_eq!(activity.progress(), 1.0);

        activity.report(f64::NAN, None);
        assert_eq!(activity.progress(), 0.0);
    }

    #[test]
    fn test_report_accepts_lower_values() {
        let activity = Activity::new("regress", None).unwrap();
        activity.report(0.8, None);
        activity.report(0.3, None);
        assert_eq!(activity.progress(), 0.3);
    }

    #[test]
    fn test_report_keeps_message_when_blank() {
        let activity = Activity::new("msg", None).unwrap();
        let events = record(&activity);

        activity.report(0.2, Some("compiling"));
        activity.report(0.4, None);
        activity.report(0.6, Some("   "));

        assert_eq!(activity.message().as_deref(), Some("compiling"));
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        for event in events.iter() {
            match event {
                ActivityEvent::Progress { message, .. } => {
                    assert_eq!(message.as_deref(), Some("compiling"))
                }
                other => panic!("Expected Progress event, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_report_zero_still_emits() {
        let activity = Activity::new("zero", None).unwrap();
        let events = record(&activity);

        activity.report(0.0, None);

        assert_eq!(kinds(&events), vec!["progress"]);
    }

    #[test]
    fn test_report_message_keeps_value() {
        let activity = Activity::new("value", None).unwrap();
        let events = record(&activity);

        activity.report(0.25, None);
        activity.report_message("still going");

        assert_eq!(activity.progress(), 0.25);
        match events.lock().unwrap().last() {
            Some(ActivityEvent::Progress { value, message, .. }) => {
                assert_eq!(*value, 0.25);
                assert_eq!(message.as_deref(), Some("still going"));
            }
            other => panic!("Expected Progress event, got {other:?}"),
        }
    }

    #[test]
    fn test_start_is_idempotent() {
        let activity = Activity::new("start", None).unwrap();
        let events = record(&activity);

        activity.start();
        activity.start();
        activity.start_with("ignored");

        assert_eq!(kinds(&events), vec!["started"]);
        assert_eq!(activity.lifecycle(), Lifecycle::Running);
        assert_eq!(activity.message(), None);
    }

    #[test]
    fn test_start_with_message_reports_progress_first() {
        let activity = Activity::new("start", None).unwrap();
        let events = record(&activity);

        activity.start_with("preparing");

        assert_eq!(kinds(&events), vec!["progress", "started"]);
        assert_eq!(activity.message().as_deref(), Some("preparing"));
        assert_eq!(activity.progress(), 0.0);
    }

    #[test]
    fn test_stop_forces_full_progress() {
        let activity = Activity::new("stop", None).unwrap();
        let events = record(&activity);

        activity.start();
        activity.report(0.3, Some("partial"));
        activity.stop_with("done");

        assert_eq!(activity.progress(), 1.0);
        assert_eq!(activity.message().as_deref(), Some("done"));
        assert_eq!(activity.lifecycle(), Lifecycle::Stopped);
        assert_eq!(
            kinds(&events),
            vec!["started", "progress", "progress", "stopped"]
        );
    }

    #[test]
    fn test_stop_reemits_on_every_call() {
        let activity = Activity::new("stop", None).unwrap();
        let events = record(&activity);

        activity.start();
        activity.stop();
        activity.stop();

        assert_eq!(
            kinds(&events),
            vec!["started", "progress", "stopped", "progress", "stopped"]
        );
    }

    #[test]
    fn test_stop_without_start_is_legal() {
        let activity = Activity::new("never", None).unwrap();
        let events = record(&activity);

        activity.stop();
        assert_eq!(activity.lifecycle(), Lifecycle::Stopped);
        activity.dispose();
        drop(activity);

        assert_eq!(kinds(&events), vec!["progress", "stopped"]);
    }

    #[test]
    fn test_start_after_stop_is_ignored() {
        let activity = Activity::new("late", None).unwrap();
        let events = record(&activity);

        activity.stop();
        activity.start_with("too late");
        assert_eq!(activity.lifecycle(), Lifecycle::Stopped);
        assert_eq!(activity.message(), None);
        drop(activity);

        assert_eq!(kinds(&events), vec!["progress", "stopped"]);
    }

    #[test]
    fn test_observer_may_read_the_activity() {
        let activity = Arc::new(Activity::new("reentrant", None).unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        activity.subscribe(Arc::new({
            let activity = Arc::downgrade(&activity);
            let seen = seen.clone();
            move |_: &ActivityEvent| {
                if let Some(activity) = activity.upgrade() {
                    seen.lock().unwrap().push((activity.lifecycle(), activity.progress()));
                }
            }
        }));

        activity.start();
        activity.report(0.5, None);
        activity.stop();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (Lifecycle::Running, 0.0),
                (Lifecycle::Running, 0.5),
                (Lifecycle::Stopped, 1.0),
                (Lifecycle::Stopped, 1.0),
            ]
        );
    }

    #[test]
    fn test_log_allowed_at_any_point() {
        let activity = Activity::new("log", None).unwrap();
        let events = record(&activity);

        activity.log(LogLevel::Debug, "before");
        activity.start();
        activity.log(LogLevel::Stdout, "during");
        activity.stop();
        activity.log(LogLevel::Error, "after");

        assert_eq!(
            kinds(&events),
            vec!["log", "started", "log", "progress", "stopped", "log"]
        );
    }

    #[test]
    fn test_fail_sets_flag_without_events() {
        let activity = Activity::new("fail", None).unwrap();
        let events = record(&activity);

        activity.start();
        activity.fail();

        assert!(activity.is_failed());
        assert_eq!(activity.lifecycle(), Lifecycle::Running);
        assert_eq!(kinds(&events), vec!["started"]);
    }

    #[test]
    fn test_dispose_unstarted_is_silent() {
        let activity = Activity::new("unstarted", None).unwrap();
        let events = record(&activity);

        activity.dispose();
        drop(activity);

        assert!(kinds(&events).is_empty());
    }

    #[test]
    fn test_dispose_stops_once() {
        let activity = Activity::new("dispose", None).unwrap();
        let events = record(&activity);

        activity.start();
        activity.dispose();
        activity.dispose();
        drop(activity);

        assert_eq!(kinds(&events), vec!["started", "progress", "stopped"]);
    }

    #[test]
    fn test_drop_stops_started_activity() {
        let activity = Activity::new("drop", None).unwrap();
        let events = record(&activity);

        activity.start();
        drop(activity);

        assert_eq!(kinds(&events), vec!["started", "progress", "stopped"]);
    }
}
