//! Advisory in-flight flags for mutation submissions.
//!
//! A flag is raised when a mutation is submitted for an entity and lowered
//! once the owning store holds a different `Arc` for that entity, i.e. an
//! authoritative copy has arrived. The guard only suppresses duplicate
//! submissions; it never blocks event application.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Per-entity in-flight flags.
#[derive(Debug, Clone)]
pub struct MutationGuard<K, T> {
    in_flight: HashMap<K, Option<Arc<T>>>,
}

impl<K, T> Default for MutationGuard<K, T> {
    fn default() -> Self {
        Self {
            in_flight: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, T> MutationGuard<K, T> {
    /// A guard with no flags raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag for `key`, remembering the entity as currently held.
    ///
    /// Returns `false` (and changes nothing) if a submission is already in
    /// flight for `key`.
    pub fn begin(&mut self, key: &K, current: Option<&Arc<T>>) -> bool {
        if self.in_flight.contains_key(key) {
            return false;
        }
        self.in_flight.insert(key.clone(), current.cloned());
        true
    }

    /// Whether a submission is in flight for `key`.
    pub fn is_pending(&self, key: &K) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Lower the flag for `key` explicitly.
    pub fn finish(&mut self, key: &K) -> bool {
        self.in_flight.remove(key).is_some()
    }

    /// Lower every flag whose entity is no longer the `Arc` seen at
    /// submission. Returns how many were lowered.
    pub fn settle<'a, F>(&mut self, current: F) -> usize
    where
        F: Fn(&K) -> Option<&'a Arc<T>>,
        T: 'a,
    {
        let before = self.in_flight.len();
        self.in_flight
            .retain(|key, seen| match (current(key), seen.as_ref()) {
                (Some(now), Some(seen)) => Arc::ptr_eq(now, seen),
                (None, None) => true,
                _ => false,
            });
        before - self.in_flight.len()
    }

    /// Number of raised flags.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether no flag is raised.
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Discard every flag.
    pub fn clear(&mut self) {
        self.in_flight.clear();
    }
}
