//! Keyed reader/writer locks.
//!
//! All sync locking is scoped per key (user id, or (user, calendar) for
//! watch channels); there is no global lock across users. Pulls take the
//! exclusive side; pushes for the same user take the shared side, so they
//! can overlap each other but never an in-flight pull.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

pub struct KeyedLocks<K> {
    inner: Mutex<HashMap<K, Arc<RwLock<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        KeyedLocks {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access for `key`. Waiters queue; they are never dropped.
    pub async fn exclusive(&self, key: &K) -> OwnedRwLockWriteGuard<()> {
        self.entry(key).write_owned().await
    }

    /// Shared access for `key`: concurrent with other shared holders,
    /// mutually exclusive with `exclusive`.
    pub async fn shared(&self, key: &K) -> OwnedRwLockReadGuard<()> {
        self.entry(key).read_owned().await
    }

    fn entry(&self, key: &K) -> Arc<RwLock<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Drop entries nobody holds anymore so the map tracks active keys only.
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }
}
