//! Per-key single-flight tracking for the pipelines.
//!
//! Only one task may run the verify/publish/commit phase for a given
//! idempotency key at a time. The guard releases the key on drop, so error
//! paths unlock without bookkeeping.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct InflightSet {
    keys: Mutex<HashSet<String>>,
}

impl InflightSet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim a key. Returns `None` if another task holds it.
    pub fn try_acquire(self: &Arc<Self>, key: &str) -> Option<InflightGuard> {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key.to_string()) {
            return None;
        }
        Some(InflightGuard {
            set: Arc::clone(self),
            key: key.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct InflightGuard {
    set: Arc<InflightSet>,
    key: String,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let mut keys = self.set.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.remove(&self.key);
    }
}
