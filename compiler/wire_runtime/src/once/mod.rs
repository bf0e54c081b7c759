//! Exactly-once concurrent map.
//!
//! `OnceMap` is the primitive behind the singleton cache, explicit scope
//! caching and the container's factory map: for each key, the creation
//! closure runs at most once at a time, and once it succeeds its value is
//! returned to every later caller.
//!
//! # Locking
//!
//! Each key owns a slot: a `parking_lot::ReentrantMutex` around a `RefCell`
//! state. The `DashMap` shard lock is only held long enough to fetch or
//! insert the slot's `Arc`; the creation closure runs under the slot's own
//! lock. Racing threads block on that lock and then observe the stored
//! value. The owning thread re-entering its own slot (a construction that
//! transitively asks for itself) finds the slot `Building` and gets the
//! caller's re-entry error instead of a deadlock.
//!
//! A failed creation puts the slot back to `Vacant`; the next caller runs
//! the closure again.
//!
//! `get_or_try_publish_with` is the lock-free-creation variant for values
//! whose creation is pure: the closure runs with no slot lock held, racing
//! creators may each run it, and the first value published wins. Creation
//! that can itself ask for other keys of the same map must use this variant,
//! since two threads holding each other's slot locks would never wake.

use std::cell::RefCell;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use rustc_hash::FxBuildHasher;

enum SlotState<V> {
    Vacant,
    Building,
    Ready(V),
}

type Slot<V> = Arc<ReentrantMutex<RefCell<SlotState<V>>>>;

/// Concurrent map whose values are created exactly once per key.
pub struct OnceMap<K, V> {
    slots: DashMap<K, Slot<V>, FxBuildHasher>,
}

impl<K, V> Default for OnceMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        OnceMap {
            slots: DashMap::with_hasher(FxBuildHasher),
        }
    }
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: K) -> Slot<V> {
        // The shard guard returned by `entry` is dropped at the end of this
        // statement, before any closure runs.
        Arc::clone(
            self.slots
                .entry(key)
                .or_insert_with(|| Arc::new(ReentrantMutex::new(RefCell::new(SlotState::Vacant))))
                .value(),
        )
    }

    /// The stored value for `key`, if creation has completed.
    ///
    /// Blocks while another thread is creating the value.
    pub fn get(&self, key: &K) -> Option<V> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        let guard = slot.lock();
        let state = guard.borrow();
        match &*state {
            SlotState::Ready(value) => Some(value.clone()),
            SlotState::Vacant | SlotState::Building => None,
        }
    }

    /// The value for `key`, creating it with `create` if absent.
    ///
    /// `on_reentry` builds the error returned when the current thread asks for
    /// a key it is already creating.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        create: impl FnOnce() -> Result<V, E>,
        on_reentry: impl FnOnce() -> E,
    ) -> Result<V, E> {
        let slot = self.slot(key);
        let guard = slot.lock();
        {
            let state = guard.borrow();
            match &*state {
                SlotState::Ready(value) => return Ok(value.clone()),
                SlotState::Building => return Err(on_reentry()),
                SlotState::Vacant => {}
            }
        }

        *guard.borrow_mut() = SlotState::Building;
        let result = create();
        *guard.borrow_mut() = match &result {
            Ok(value) => SlotState::Ready(value.clone()),
            Err(_) => SlotState::Vacant,
        };
        result
    }

    /// The value for `key`, creating it with `create` if absent, without
    /// holding the slot lock while `create` runs.
    ///
    /// Concurrent callers may each run `create`; the first value stored is
    /// returned to all of them and the others are dropped. Must not be mixed
    /// with `get_or_try_insert_with` on the same map.
    pub fn get_or_try_publish_with<E>(
        &self,
        key: K,
        create: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = create()?;
        let slot = self.slot(key);
        let guard = slot.lock();
        let mut state = guard.borrow_mut();
        if let SlotState::Ready(published) = &*state {
            return Ok(published.clone());
        }
        *state = SlotState::Ready(value.clone());
        Ok(value)
    }

    /// Number of keys with a completed value.
    pub fn len(&self) -> usize {
        // Slot locks are taken after the shard locks are released: a slot's
        // creator may be inserting into this map.
        let slots: Vec<Slot<V>> = self.slots.iter().map(|e| Arc::clone(e.value())).collect();
        slots
            .iter()
            .filter(|slot| matches!(&*slot.lock().borrow(), SlotState::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every stored value.
    ///
    /// Creations already in flight complete into their detached slots and are
    /// not visible afterwards.
    pub fn clear(&self) {
        self.slots.clear();
    }
}
