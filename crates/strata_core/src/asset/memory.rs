//! In-memory asset resolver.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::cache::AssetCache;
use super::resolver::{
    normalize_asset_path, AssetBytes, AssetResolver, FetchError, FetchResult, ResolvedAsset,
};

/// Resolves asset paths against an in-memory document table.
///
/// The table plays the role of the transport: a resolve that misses the
/// cache reads from it and counts as a fetch. Paths registered with
/// [`MemoryResolver::with_failure`] fail with a transport error, which makes
/// this resolver convenient for exercising failure propagation.
///
/// # Example
///
/// ```ignore
/// let resolver = MemoryResolver::new()
///     .with_document("root.json", r#"{ "subLayers": ["base.json"] }"#)
///     .with_document("base.json", "{}");
/// ```
#[derive(Debug, Default)]
pub struct MemoryResolver {
    documents: HashMap<String, AssetBytes>,
    failures: HashMap<String, String>,
    cache: AssetCache,
    fetch_log: Mutex<Vec<String>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under `asset_path`.
    pub fn with_document(mut self, asset_path: &str, content: impl AsRef<[u8]>) -> Self {
        self.insert(asset_path, content);
        self
    }

    /// Make resolving `asset_path` fail with a transport error.
    pub fn with_failure(mut self, asset_path: &str, message: impl Into<String>) -> Self {
        self.failures
            .insert(normalize_asset_path(asset_path), message.into());
        self
    }

    /// Register or replace a document.
    pub fn insert(&mut self, asset_path: &str, content: impl AsRef<[u8]>) {
        self.documents.insert(
            normalize_asset_path(asset_path),
            AssetBytes::from(content.as_ref()),
        );
    }

    /// Number of transport fetches (cache misses) served so far.
    pub fn fetch_count(&self) -> usize {
        self.log().len()
    }

    /// Asset paths fetched from the table, in fetch order.
    pub fn fetched(&self) -> Vec<String> {
        self.log().clone()
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.fetch_log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait(?Send)]
impl AssetResolver for MemoryResolver {
    async fn resolve(&self, asset_path: &str) -> FetchResult<ResolvedAsset> {
        let uri = normalize_asset_path(asset_path);

        if let Some(bytes) = self.cache.get(&uri) {
            return Ok(ResolvedAsset::new(uri, bytes));
        }

        if let Some(message) = self.failures.get(&uri) {
            return Err(FetchError::Transport {
                path: asset_path.to_string(),
                message: message.clone(),
            });
        }

        let bytes = self
            .documents
            .get(&uri)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                path: asset_path.to_string(),
            })?;

        self.log().push(uri.clone());
        self.cache.insert(&uri, bytes.clone());
        log::debug!("Resolved '{}' from memory ({} bytes)", uri, bytes.len());

        Ok(ResolvedAsset::new(uri, bytes))
    }

    fn set_asset(&self, uri: &str, bytes: AssetBytes) {
        self.cache.insert(uri, bytes);
    }

    fn get_asset(&self, uri: &str) -> Option<AssetBytes> {
        self.cache.get(uri)
    }
}
