//! Entity state shared by every bound entity
//!
//! A [`BoundEntityCore`] holds an entity's fixed identity, its device, the
//! [`Locator`] of its entry and the entry last extracted from a snapshot.
//! Every refresh resolves the locator against the coordinator's current
//! snapshot and replaces the cached entry wholesale. When the entry cannot
//! be found the entity turns unavailable and keeps its last-known entry.

use amc_coordinator::{Coordinator, ListenerHandle};
use amc_core::{AmcEntry, Locator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, info, trace, warn};

use crate::device::DeviceInfo;
use crate::identity::EntityIdentity;

/// Where an entity is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Built, not yet attached to a coordinator
    Created,
    /// Receiving refreshes
    Bound,
    /// Unloaded; refreshes are ignored
    Detached,
}

#[derive(Debug, Clone)]
struct CachedEntry {
    entry: AmcEntry,
    extraction_ok: bool,
    update_success: bool,
    lifecycle: Lifecycle,
    last_changed: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

/// Identity and refresh state of one entity
#[derive(Debug)]
pub struct BoundEntityCore {
    identity: EntityIdentity,
    device_info: DeviceInfo,
    locator: Locator,
    state: RwLock<CachedEntry>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl BoundEntityCore {
    /// Create a new core from the entry found at discovery
    pub fn new(
        identity: EntityIdentity,
        device_info: DeviceInfo,
        locator: Locator,
        entry: AmcEntry,
    ) -> Self {
        let now = Utc::now();
        Self {
            identity,
            device_info,
            locator,
            state: RwLock::new(CachedEntry {
                entry,
                extraction_ok: true,
                update_success: true,
                lifecycle: Lifecycle::Created,
                last_changed: now,
                last_updated: now,
            }),
            listener: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> &EntityIdentity {
        &self.identity
    }

    pub fn unique_id(&self) -> &str {
        &self.identity.unique_id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// The last entry extracted successfully
    pub fn entry(&self) -> AmcEntry {
        self.read(|state| state.entry.clone())
    }

    /// The full entry as generic attributes
    pub fn extra_state_attributes(&self) -> Map<String, Value> {
        self.read(|state| state.entry.to_attributes())
    }

    /// Available when the coordinator's last update and the last extraction both succeeded
    pub fn available(&self) -> bool {
        self.read(|state| state.update_success && state.extraction_ok)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.read(|state| state.lifecycle)
    }

    pub fn last_changed(&self) -> DateTime<Utc> {
        self.read(|state| state.last_changed)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.read(|state| state.last_updated)
    }

    fn read<T>(&self, f: impl FnOnce(&CachedEntry) -> T) -> T {
        match self.state.read() {
            Ok(state) => f(&state),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Re-extract this entity's entry from the coordinator's current snapshot
    ///
    /// Returns the new entry when extraction succeeded, `None` when the entry
    /// is missing or the entity is detached.
    pub fn refresh(&self, coordinator: &Coordinator) -> Option<AmcEntry> {
        let snapshot = coordinator.data();
        let resolved = self.locator.resolve(&snapshot);
        let update_success = coordinator.last_update_success();

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.lifecycle == Lifecycle::Detached {
            trace!(unique_id = %self.identity.unique_id, "Ignoring refresh of detached entity");
            return None;
        }

        let was_available = state.update_success && state.extraction_ok;
        state.update_success = update_success;

        let refreshed = match resolved {
            Ok(entry) => {
                let now = Utc::now();
                if state.entry != entry {
                    state.last_changed = now;
                }
                state.entry = entry.clone();
                state.extraction_ok = true;
                state.last_updated = now;
                debug!(locator = %self.locator, "Entry refreshed");
                Some(entry)
            }
            Err(err) => {
                if state.extraction_ok {
                    warn!(locator = %self.locator, error = %err, "Entry missing from snapshot");
                }
                state.extraction_ok = false;
                None
            }
        };

        let available = state.update_success && state.extraction_ok;
        if was_available != available {
            state.last_changed = Utc::now();
            if available {
                info!(unique_id = %self.identity.unique_id, "Entity available again");
            } else {
                warn!(unique_id = %self.identity.unique_id, "Entity unavailable");
            }
        }

        refreshed
    }

    /// Record the listener handle of a freshly attached entity
    ///
    /// Returns false, and removes the handle again, unless the entity was
    /// still [`Lifecycle::Created`].
    pub fn bind(&self, handle: ListenerHandle) -> bool {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.lifecycle != Lifecycle::Created {
                drop(state);
                handle.remove();
                return false;
            }
            state.lifecycle = Lifecycle::Bound;
        }
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        debug!(unique_id = %self.identity.unique_id, "Entity bound to coordinator");
        true
    }

    /// Stop receiving refreshes; unsubscribes the listener
    pub fn detach(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .lifecycle = Lifecycle::Detached;
        let handle = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.remove();
        }
        debug!(unique_id = %self.identity.unique_id, "Entity detached");
    }
}

impl Drop for BoundEntityCore {
    /// A dropped entity leaves no listener behind
    fn drop(&mut self) {
        let handle = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            trace!(unique_id = %self.identity.unique_id, "Dropping listener of dropped entity");
            handle.remove();
        }
    }
}
