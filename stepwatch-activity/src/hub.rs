//! Per-activity publish/subscribe plumbing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::events::ActivityEvent;

/// Receives the events raised by an activity.
///
/// Observers are invoked synchronously on the thread that mutated the activity,
/// after its state was updated and the state lock released. Events of one
/// activity are delivered one at a time, in order. Observers may read the
/// activity but must not mutate the one that raised the event.
pub trait ActivityObserver: Send + Sync {
    fn on_event(&self, event: &ActivityEvent);
}

impl<F> ActivityObserver for F
where
    F: Fn(&ActivityEvent) + Send + Sync,
{
    fn on_event(&self, event: &ActivityEvent) {
        self(event)
    }
}

/// Handle returned by [`Activity::subscribe`](crate::Activity::subscribe), used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn ActivityObserver>)>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self, observer: Arc<dyn ActivityObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver an event to every current observer and mirror it to tracing.
    pub(crate) fn emit(&self, event: ActivityEvent) {
        if tracing::enabled!(target: "stepwatch::activity", tracing::Level::TRACE)
            && let Ok(json) = serde_json::to_string(&event)
        {
            tracing::trace!(target: "stepwatch::activity", event = %json);
        }

        // Snapshot the list so observers may (un)subscribe without deadlocking.
        let observers: Vec<Arc<dyn ActivityObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer.on_event(&event);
        }
    }
}
