//! Snapshot coordinator for the AMC alarm bridge
//!
//! The [`Coordinator`] owns the latest [`Snapshot`] of every central and the
//! static integration options. Whatever produces snapshots (the panel API
//! client) hands each new one to [`Coordinator::set_updated_data`]; the
//! coordinator swaps it in wholesale and notifies every listener
//! synchronously, in registration order.
//!
//! Listeners are registered explicitly with [`Coordinator::add_listener`] and
//! removed explicitly with [`ListenerHandle::remove`]. Async observers can
//! instead follow snapshots through [`Coordinator::subscribe`].

use amc_config::{ConfigKey, ConfigResult, IntegrationOptions};
use amc_core::Snapshot;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace, warn};

/// Callback invoked after every coordinator update
pub type Listener = Arc<dyn Fn(&Coordinator) + Send + Sync>;

/// A unique identifier for a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registered listeners, in registration order
#[derive(Default)]
struct ListenerRegistry {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
}

impl ListenerRegistry {
    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        // A panicking listener must not take every other entity down with it
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.lock().push((id, listener));
        id
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    fn snapshot(&self) -> Vec<(ListenerId, Listener)> {
        self.lock().clone()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Handle returned by [`Coordinator::add_listener`]
///
/// Dropping the handle does not unsubscribe; call [`remove`](Self::remove).
#[derive(Debug)]
#[must_use = "a listener stays registered until the handle is removed"]
pub struct ListenerHandle {
    id: ListenerId,
    registry: Weak<ListenerRegistry>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Unsubscribe the listener
    ///
    /// Returns false if the listener was already gone (or the coordinator
    /// was dropped).
    pub fn remove(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Holds the current snapshot and fans refreshes out to listeners
pub struct Coordinator {
    options: IntegrationOptions,
    id_prefix: String,
    /// The current snapshot lives in the watch channel
    sender: watch::Sender<Arc<Snapshot>>,
    last_update_success: AtomicBool,
    registry: Arc<ListenerRegistry>,
}

impl Coordinator {
    /// Create a coordinator seeded with the first snapshot
    pub fn new(options: IntegrationOptions, snapshot: Snapshot) -> ConfigResult<Self> {
        let id_prefix = options.get_str(ConfigKey::IdPrefix)?.to_string();
        let (sender, _) = watch::channel(Arc::new(snapshot));

        info!(id_prefix = %id_prefix, "Coordinator created");

        Ok(Self {
            options,
            id_prefix,
            sender,
            last_update_success: AtomicBool::new(true),
            registry: Arc::new(ListenerRegistry::default()),
        })
    }

    /// The latest snapshot
    pub fn data(&self) -> Arc<Snapshot> {
        self.sender.borrow().clone()
    }

    /// Look up a static option
    pub fn get_config(&self, key: ConfigKey) -> Option<&serde_json::Value> {
        self.options.get(key)
    }

    /// Get a string option that must be present
    pub fn get_str(&self, key: ConfigKey) -> ConfigResult<&str> {
        self.options.get_str(key)
    }

    /// Get a boolean option that must be present
    pub fn get_bool(&self, key: ConfigKey) -> ConfigResult<bool> {
        self.options.get_bool(key)
    }

    pub fn options(&self) -> &IntegrationOptions {
        &self.options
    }

    /// Namespace prepended to every unique id this coordinator's entities generate
    pub fn get_id_prefix(&self) -> &str {
        &self.id_prefix
    }

    /// Whether the most recent update delivered a snapshot
    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::SeqCst)
    }

    /// Register a listener, called after every update
    pub fn add_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&Coordinator) + Send + Sync + 'static,
    {
        let id = self.registry.add(Arc::new(listener));
        trace!(listener = id.0, "Listener added");
        ListenerHandle {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Get the number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    /// Follow snapshots asynchronously
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.sender.subscribe()
    }

    /// Replace the snapshot and notify every listener
    #[instrument(skip(self, snapshot), fields(centrals = snapshot.len()))]
    pub fn set_updated_data(&self, snapshot: Snapshot) {
        self.sender.send_replace(Arc::new(snapshot));
        if !self.last_update_success.swap(true, Ordering::SeqCst) {
            info!("Coordinator update recovered");
        }
        debug!("Snapshot replaced");
        self.update_listeners();
    }

    /// Record a failed update; the previous snapshot stays current
    #[instrument(skip(self, reason))]
    pub fn set_update_error(&self, reason: impl fmt::Display) {
        if self.last_update_success.swap(false, Ordering::SeqCst) {
            warn!(%reason, "Coordinator update failed");
        } else {
            debug!(%reason, "Coordinator update still failing");
        }
        self.update_listeners();
    }

    /// Call every listener once
    ///
    /// Listeners run outside the registry lock so they may add or remove
    /// listeners (including themselves) while being notified.
    pub fn update_listeners(&self) {
        let listeners = self.registry.snapshot();
        trace!(count = listeners.len(), "Notifying listeners");
        for (_, listener) in listeners {
            listener(self);
        }
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("id_prefix", &self.id_prefix)
            .field("last_update_success", &self.last_update_success())
            .field("registry", &self.registry)
            .finish()
    }
}

/// Thread-safe wrapper for Coordinator
pub type SharedCoordinator = Arc<Coordinator>;

#[cfg(test)]
mod tests {
    use super::*;
    use amc_core::CentralState;
    use std::sync::atomic::AtomicUsize;

    fn coordinator() -> Coordinator {
        Coordinator::new(IntegrationOptions::default(), Snapshot::new()).unwrap()
    }

    fn snapshot_with(central_id: &str) -> Snapshot {
        Snapshot::new().with_central(central_id, CentralState::default())
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let coordinator = coordinator();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let calls = calls.clone();
            coordinator.add_listener(move |_| calls.lock().unwrap().push("first"))
        };
        let second = {
            let calls = calls.clone();
            coordinator.add_listener(move |_| calls.lock().unwrap().push("second"))
        };

        coordinator.set_updated_data(snapshot_with("C1"));
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_listener_sees_new_snapshot() {
        let coordinator = coordinator();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _handle = {
            let seen = seen.clone();
            coordinator.add_listener(move |c| {
                let ids: Vec<String> = c.data().central_ids().map(String::from).collect();
                seen.lock().unwrap().push(ids);
            })
        };

        coordinator.set_updated_data(snapshot_with("C1"));
        coordinator.set_updated_data(snapshot_with("C2"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![vec!["C1".to_string()], vec!["C2".to_string()]]
        );
    }

    #[test]
    fn test_removed_listener_is_not_called() {
        let coordinator = coordinator();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = {
            let count = count.clone();
            coordinator.add_listener(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        coordinator.set_updated_data(Snapshot::new());
        assert!(handle.remove());
        coordinator.set_updated_data(Snapshot::new());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.listener_count(), 0);
    }

    #[test]
    fn test_listener_can_remove_itself() {
        let coordinator = coordinator();
        let slot: Arc<Mutex<Option<ListenerHandle>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicUsize::new(0));

        let handle = {
            let slot = slot.clone();
            let count = count.clone();
            coordinator.add_listener(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                if let Some(handle) = slot.lock().unwrap().take() {
                    handle.remove();
                }
            })
        };
        *slot.lock().unwrap() = Some(handle);

        coordinator.set_updated_data(Snapshot::new());
        coordinator.set_updated_data(Snapshot::new());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.listener_count(), 0);
    }

    #[test]
    fn test_update_error_keeps_snapshot_and_notifies() {
        let coordinator =
            Coordinator::new(IntegrationOptions::default(), snapshot_with("C1")).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let _handle = {
            let count = count.clone();
            coordinator.add_listener(move |c| {
                assert!(!c.last_update_success());
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        coordinator.set_update_error("connection reset");

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(coordinator.data().central("C1").is_some());
    }

    #[test]
    fn test_success_restores_after_error() {
        let coordinator = coordinator();
        coordinator.set_update_error("timeout");
        assert!(!coordinator.last_update_success());
        coordinator.set_updated_data(Snapshot::new());
        assert!(coordinator.last_update_success());
    }

    #[test]
    fn test_id_prefix_and_config() {
        let options = IntegrationOptions::default()
            .with(ConfigKey::IdPrefix, "amc_")
            .unwrap()
            .with(ConfigKey::StatusZonePrefix, "Zone")
            .unwrap();
        let coordinator = Coordinator::new(options, Snapshot::new()).unwrap();

        assert_eq!(coordinator.get_id_prefix(), "amc_");
        assert_eq!(
            coordinator.get_config(ConfigKey::StatusZonePrefix),
            Some(&serde_json::Value::from("Zone"))
        );
        assert_eq!(coordinator.get_config(ConfigKey::Title), None);
    }

    #[test]
    fn test_typed_option_lookups() {
        let coordinator = coordinator();
        assert!(coordinator.get_bool(ConfigKey::StatusZoneIncluded).unwrap());
        assert_eq!(coordinator.get_str(ConfigKey::StatusSystemPrefix).unwrap(), "");
        assert!(coordinator.get_str(ConfigKey::Title).is_err());
    }

    #[test]
    fn test_subscriber_sees_latest_after_burst() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe();
        coordinator.set_updated_data(snapshot_with("C1"));
        coordinator.set_updated_data(snapshot_with("C2"));

        tokio_test::block_on(async {
            rx.changed().await.unwrap();
        });
        assert!(rx.borrow().central("C2").is_some());
        assert!(rx.borrow().central("C1").is_none());
    }

    #[test]
    fn test_remove_after_coordinator_dropped() {
        let coordinator = coordinator();
        let handle = coordinator.add_listener(|_| {});
        drop(coordinator);
        assert!(!handle.remove());
    }

    #[tokio::test]
    async fn test_subscribe_receives_snapshots() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe();

        coordinator.set_updated_data(snapshot_with("C9"));

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().central("C9").is_some());
    }
}
