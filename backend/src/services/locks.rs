//! Per-practitioner write serialization.
//!
//! Check-and-write sequences for one practitioner must not interleave. The
//! registry hands out one async mutex per practitioner key; a caller that
//! touches several practitioners acquires them in key order.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::PractitionerRef;

#[derive(Clone, Default)]
pub struct PractitionerLocks {
    registry: Arc<Mutex<HashMap<PractitionerRef, Arc<AsyncMutex<()>>>>>,
}

/// Held locks; released on drop.
pub struct PractitionerGuard {
    guards: Vec<OwnedMutexGuard<()>>,
}

impl PractitionerGuard {
    pub fn held(&self) -> usize {
        self.guards.len()
    }
}

impl PractitionerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &PractitionerRef) -> Arc<AsyncMutex<()>> {
        self.registry
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Acquire every distinct key, in sorted order.
    pub async fn lock<'a, I>(&self, keys: I) -> PractitionerGuard
    where
        I: IntoIterator<Item = &'a PractitionerRef>,
    {
        let ordered: BTreeSet<&PractitionerRef> = keys.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            guards.push(self.entry(key).lock_owned().await);
        }
        PractitionerGuard { guards }
    }

    /// Number of practitioners that ever took a lock.
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
