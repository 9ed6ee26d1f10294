//! Request-scoped key/value storage.
//!
//! Middleware and handlers share values through string keys. Values are
//! type-erased on insertion and checked with a downcast on retrieval, so a
//! wrong type is reported as [`StoreError::TypeMismatch`] instead of being
//! silently reinterpreted.
//!
//! ```rust
//! use switchyard_core::Store;
//!
//! let mut store = Store::new();
//! store.insert("user_id", 42u64);
//!
//! assert_eq!(store.get::<u64>("user_id"), Some(&42));
//! assert_eq!(store.get::<String>("user_id"), None);
//! ```

use crate::StoreError;
use std::any::{Any, type_name};
use std::collections::HashMap;

#[derive(Default)]
pub struct Store {
    map: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Store {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing whatever was stored under `key`.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.map.insert(key.into(), Box::new(value));
    }

    /// Get a value, or `None` when absent or of another type.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.map.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Like [`Store::get`] but tells "absent" and "wrong type" apart.
    pub fn try_get<T: Send + Sync + 'static>(&self, key: &str) -> Result<&T, StoreError> {
        let value = self
            .map
            .get(key)
            .ok_or_else(|| StoreError::Missing(key.to_string()))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| StoreError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.map.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Remove and return a value of type `T`. A value of another type is
    /// left in place.
    pub fn remove<T: Send + Sync + 'static>(&mut self, key: &str) -> Option<T> {
        if !self.map.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.map
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("keys", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}
