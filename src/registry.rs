//! Handle registry guarding detector instance lifecycle.

use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Opaque token identifying one instance slot across the call boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Numeric identity of the handle, for diagnostics
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Registry mapping opaque handles to owned instances.
///
/// Each slot holds at most one live instance. A single registry-wide mutex
/// serializes slot reads and swaps; it is held only for the swap itself,
/// never for the duration of a detection call. Replacing a slot drops the
/// previous owner, so the old instance is destroyed as soon as no
/// in-flight call still holds a clone of it.
///
/// Instances are stored as `Arc<Mutex<T>>`: calls on one instance
/// serialize on the per-instance mutex, not on the registry lock.
pub struct Registry<T> {
    slots: Mutex<HashMap<u64, Option<Arc<Mutex<T>>>>>,
    next_id: AtomicU64,
}

impl<T> Registry<T> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn slots(&self) -> Result<MutexGuard<'_, HashMap<u64, Option<Arc<Mutex<T>>>>>> {
        self.slots.lock().map_err(|_| Error::LockPoisoned("registry"))
    }

    /// Allocate a new, empty slot and return its handle
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned
    pub fn create(&self) -> Result<Handle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots()?.insert(id, None);
        Ok(Handle(id))
    }

    /// Replace the slot's instance, destroying any previous one first.
    ///
    /// Passing `None` deinitializes the slot; doing so on an already empty
    /// slot is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was never allocated or the registry
    /// lock is poisoned
    pub fn replace(&self, handle: Handle, instance: Option<T>) -> Result<()> {
        let mut slots = self.slots()?;
        let slot = slots
            .get_mut(&handle.0)
            .ok_or(Error::InvalidHandle(handle.0))?;

        if let Some(old) = slot.take() {
            log::debug!("Destroying previous instance for handle {}", handle.0);
            drop(old);
        }

        *slot = instance.map(|value| Arc::new(Mutex::new(value)));
        Ok(())
    }

    /// The slot's current instance, or `None` when deinitialized
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was never allocated or the registry
    /// lock is poisoned
    pub fn get(&self, handle: Handle) -> Result<Option<Arc<Mutex<T>>>> {
        let slots = self.slots()?;
        slots
            .get(&handle.0)
            .cloned()
            .ok_or(Error::InvalidHandle(handle.0))
    }

    /// Remove the slot entirely, destroying its instance if one is live.
    /// The handle becomes invalid afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was never allocated or the registry
    /// lock is poisoned
    pub fn remove(&self, handle: Handle) -> Result<()> {
        let mut slots = self.slots()?;
        slots
            .remove(&handle.0)
            .ok_or(Error::InvalidHandle(handle.0))?;
        Ok(())
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
