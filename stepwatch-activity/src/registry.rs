//! Thread-safe registry aggregating every announced activity.
//!
//! The registry subscribes to each activity before handing it out, folds the
//! activity's events into an [`ObservationEntry`], and re-broadcasts them as
//! [`RegistryEvent`]s for renderers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use indexmap::IndexMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::Timestamp;
use crate::activity::Activity;
use crate::entry::{LogRecord, ObservationEntry, ProgressRecord};
use crate::error::ActivityResult;
use crate::events::{ActivityEvent, ActivityId};
use crate::hub::{ActivityObserver, Subscribers, SubscriptionId};

/// Default number of notifications a lagging subscriber may fall behind by
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1024;

/// Aggregate change notification
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Announced {
        id: ActivityId,
        name: String,
        description: Option<String>,
        timestamp: Timestamp,
    },
    /// Started, Stopped, Progress or Log, after the entry was updated
    Activity(ActivityEvent),
}

impl RegistryEvent {
    pub fn id(&self) -> ActivityId {
        match self {
            RegistryEvent::Announced { id, .. } => *id,
            RegistryEvent::Activity(event) => event.id(),
        }
    }
}

struct Slot {
    entry: Mutex<ObservationEntry>,
    failed: Arc<AtomicBool>,
    subscribers: Arc<Subscribers>,
    subscription: SubscriptionId,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, ObservationEntry> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> ObservationEntry {
        let mut entry = self.lock().clone();
        entry.failed = self.failed.load(Ordering::Acquire);
        entry
    }
}

struct RegistryInner {
    slots: RwLock<IndexMap<ActivityId, Arc<Slot>>>,
    log_seq: AtomicU64,
    notifier: broadcast::Sender<RegistryEvent>,
}

impl RegistryInner {
    fn slot(&self, id: ActivityId) -> Option<Arc<Slot>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn apply(&self, event: &ActivityEvent) {
        // Only missing after teardown, when nobody should hear about it anymore.
        let Some(slot) = self.slot(event.id()) else {
            return;
        };

        {
            let mut entry = slot.lock();
            match event {
                ActivityEvent::Started { timestamp, .. } => {
                    entry.started_at = Some(*timestamp);
                }
                ActivityEvent::Stopped { timestamp, .. } => {
                    entry.ended_at = Some(*timestamp);
                }
                ActivityEvent::Progress {
                    value,
                    message,
                    timestamp,
                    ..
                } => {
                    entry.last_progress = Some(*value);
                    entry.last_progress_message = message.clone();
                    entry.progress.push(ProgressRecord {
                        timestamp: *timestamp,
                        value: *value,
                        message: message.clone(),
                    });
                }
                ActivityEvent::Log {
                    id,
                    level,
                    message,
                    timestamp,
                } => {
                    let seq = self.log_seq.fetch_add(1, Ordering::Relaxed);
                    entry.logs.push(LogRecord {
                        activity: *id,
                        timestamp: *timestamp,
                        level: *level,
                        message: message.clone(),
                        seq,
                    });
                }
            }
        }

        // No receivers is fine: nobody is rendering yet.
        let _ = self.notifier.send(RegistryEvent::Activity(event.clone()));
    }

    fn unbind_all(&self) {
        let slots = {
            let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *slots)
        };
        for slot in slots.values() {
            slot.subscribers.unsubscribe(slot.subscription);
        }
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

/// Forwards one activity's events into the registry without keeping it alive.
struct RegistryObserver {
    registry: Weak<RegistryInner>,
}

impl ActivityObserver for RegistryObserver {
    fn on_event(&self, event: &ActivityEvent) {
        if let Some(registry) = self.registry.upgrade() {
            registry.apply(event);
        }
    }
}

/// Shared store of observation entries, keyed by activity identity.
///
/// Cloning is cheap and every clone refers to the same registry. No external
/// locking is needed for any operation.
#[derive(Clone)]
pub struct ObservationRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ObservationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObservationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationRegistry")
            .field("entries", &self.len())
            .finish()
    }
}

impl ObservationRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_NOTIFICATION_CAPACITY)
    }

    /// Create a registry whose notification channel buffers `capacity` events per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (notifier, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(RegistryInner {
                slots: RwLock::new(IndexMap::new()),
                log_seq: AtomicU64::new(0),
                notifier,
            }),
        }
    }

    /// Declare an activity without starting it, reserving its display slot.
    ///
    /// The registry is subscribed before the activity is returned, so no
    /// event of the activity can be missed.
    pub fn announce(
        &self,
        name: impl Into<String>,
        description: Option<&str>,
    ) -> ActivityResult<Activity> {
        let activity = Activity::new(name, description.map(str::to_string))?;
        let subscription = activity.subscribe(Arc::new(RegistryObserver {
            registry: Arc::downgrade(&self.inner),
        }));

        let announced = {
            let mut slots = self
                .inner
                .slots
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let timestamp = Timestamp::now();
            let entry = ObservationEntry::new(
                activity.id(),
                activity.name().to_string(),
                activity.description().map(str::to_string),
                timestamp,
            );
            slots.insert(
                activity.id(),
                Arc::new(Slot {
                    entry: Mutex::new(entry),
                    failed: activity.failed_flag(),
                    subscribers: activity.subscribers(),
                    subscription,
                }),
            );
            timestamp
        };

        debug!(
            activity_id = %activity.id(),
            name = activity.name(),
            "Announced activity"
        );
        let _ = self.inner.notifier.send(RegistryEvent::Announced {
            id: activity.id(),
            name: activity.name().to_string(),
            description: activity.description().map(str::to_string),
            timestamp: announced,
        });

        Ok(activity)
    }

    /// Announce an activity and start it immediately.
    pub fn start(
        &self,
        name: impl Into<String>,
        description: Option<&str>,
    ) -> ActivityResult<Activity> {
        let activity = self.announce(name, description)?;
        activity.start();
        Ok(activity)
    }

    /// Point-in-time copy of every entry, ordered by announce time.
    ///
    /// Ordering by announce time (not start time) keeps unstarted steps in a
    /// stable position. Ties keep announce order.
    pub fn snapshot_ordered_by_announce_time(&self) -> Vec<ObservationEntry> {
        let slots: Vec<Arc<Slot>> = self
            .inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut entries: Vec<ObservationEntry> =
            slots.iter().map(|slot| slot.snapshot()).collect();
        entries.sort_by(|a, b| {
            a.announced_at
                .cmp(&b.announced_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        entries
    }

    /// Every log record across all entries, newest first.
    ///
    /// Computed fresh on each call from the state at that moment.
    pub fn latest_log_records(&self) -> std::vec::IntoIter<LogRecord> {
        let slots: Vec<Arc<Slot>> = self
            .inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut records: Vec<LogRecord> = slots
            .iter()
            .flat_map(|slot| slot.lock().logs.clone())
            .collect();
        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        records.into_iter()
    }

    /// Copy of a single entry
    pub fn entry(&self, id: ActivityId) -> Option<ObservationEntry> {
        self.inner.slot(id).map(|slot| slot.snapshot())
    }

    pub fn len(&self) -> usize {
        self.inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every subsequent change notification. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.notifier.subscribe()
    }

    /// Unsubscribe from every tracked activity and forget all entries.
    ///
    /// Activities are not stopped; their later events are simply no longer observed.
    pub fn teardown(&self) {
        debug!(entries = self.len(), "Tearing down activity registry");
        self.inner.unbind_all();
    }
}
