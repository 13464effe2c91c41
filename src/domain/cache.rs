//! Keyed singleton registries.
//!
//! Both flavors map an opaque string key to one shared instance. Callers look
//! a key up with `try_get`, build the value on a miss and store it with `set`
//! (or do both through `get_or_insert_with`); every later lookup of the same
//! key yields the same object until the key is overwritten.
//!
//! - [`ObjectsCache`] owns its values outright and hands out borrows.
//! - [`Objects`] stores a strong [`Ref`] per key and hands out new handles,
//!   so an entry can outlive the registry through those handles.
//!
//! Both release every entry on [`shutdown`](Objects::shutdown) and on drop.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::domain::refs::{Ref, RefCounted};

/// Registry owning one boxed instance per key.
pub struct ObjectsCache<T> {
    entries: HashMap<String, Box<T>>,
}

impl<T> ObjectsCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn try_get(&self, key: &str) -> Option<&T> {
        let found = self.entries.get(key).map(Box::as_ref);
        tracing::debug!(key, hit = found.is_some(), "objects cache lookup");
        found
    }

    /// Stores `value` under `key`, dropping any instance previously stored
    /// there, and returns the stored instance.
    pub fn set(&mut self, key: impl Into<String>, value: T) -> &T {
        let key = key.into();
        tracing::debug!(key = %key, "objects cache insert");
        let slot = match self.entries.entry(key) {
            Entry::Occupied(mut e) => {
                e.insert(Box::new(value));
                e.into_mut()
            }
            Entry::Vacant(e) => e.insert(Box::new(value)),
        };
        &**slot
    }

    /// Returns the instance for `key`, building and storing it on a miss.
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> T) -> &T {
        if !self.entries.contains_key(key) {
            tracing::debug!(key, "objects cache miss");
            return self.set(key, make());
        }
        tracing::debug!(key, "objects cache hit");
        &self.entries[key]
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Drops every stored instance and returns how many there were.
    pub fn shutdown(&mut self) -> usize {
        let released = self.entries.len();
        self.entries.clear();
        if released > 0 {
            tracing::info!(released, "objects cache shut down");
        }
        released
    }
}

impl<T> Default for ObjectsCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ObjectsCache<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Registry sharing one counter-managed instance per key through [`Ref`].
pub struct Objects<T: RefCounted> {
    entries: HashMap<String, Ref<T>>,
}

impl<T: RefCounted> Objects<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A new strong handle to the instance stored under `key`.
    pub fn try_get(&self, key: &str) -> Option<Ref<T>> {
        let found = self.entries.get(key).cloned();
        tracing::debug!(key, hit = found.is_some(), "objects lookup");
        found
    }

    /// Stores a strong handle to `value`'s object under `key`, releasing any
    /// handle previously stored there, and returns `value`.
    pub fn set(&mut self, key: impl Into<String>, value: Ref<T>) -> Ref<T> {
        let key = key.into();
        tracing::debug!(key = %key, "objects insert");
        self.entries.insert(key, value.clone());
        value
    }

    /// Returns the instance for `key`, building and storing it on a miss.
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> T) -> Ref<T> {
        match self.try_get(key) {
            Some(existing) => existing,
            None => self.set(key, Ref::new(make())),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Releases the registry's handle on every entry and returns how many
    /// there were. Objects still held elsewhere stay alive.
    pub fn shutdown(&mut self) -> usize {
        let released = self.entries.len();
        self.entries.clear();
        if released > 0 {
            tracing::info!(released, "objects registry shut down");
        }
        released
    }
}

impl<T: RefCounted> Default for Objects<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RefCounted> Drop for Objects<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
