//! Per-key async mutual exclusion
//!
//! [`KeyedLocks`] hands out one async mutex per key. Holders of different
//! keys never wait on each other; holders of the same key are serialized.
//! Slots are dropped from the map once nobody holds or waits on them.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// Map of async mutexes keyed by `K`
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: &K) -> KeyedGuard<'_, K> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key.clone()).or_default().clone()
        };

        let guard = slot.clone().lock_owned().await;

        KeyedGuard {
            locks: self,
            key: key.clone(),
            slot,
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one key; released on drop
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyedGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    locks: &'a KeyedLocks<K>,
    key: K,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Drop for KeyedGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        // Release the mutex before inspecting the reference count.
        self.guard.take();

        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}
