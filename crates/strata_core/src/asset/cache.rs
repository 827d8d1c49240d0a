//! URI-keyed asset cache shared by the resolvers.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::resolver::AssetBytes;

/// Append-mostly cache from canonical URI to asset bytes.
///
/// Uses a mutex so resolvers can be shared across threads by embedders,
/// even though composition itself drives them from a single task.
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: Mutex<HashMap<String, AssetBytes>>,
}

impl AssetCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the bytes cached for `uri`.
    pub fn insert(&self, uri: &str, bytes: AssetBytes) {
        self.lock().insert(uri.to_string(), bytes);
    }

    /// Cached bytes for `uri`.
    pub fn get(&self, uri: &str) -> Option<AssetBytes> {
        self.lock().get(uri).cloned()
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.lock().contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave the map half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, AssetBytes>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
