//! The asset resolver contract.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Shared, immutable asset payload.
///
/// The resolver cache, the `AssetMap` and the layer's staged assets all hold
/// clones of the same allocation.
pub type AssetBytes = Arc<[u8]>;

/// Errors reported by an asset resolver's transport.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Asset not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read asset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport error for asset '{path}': {message}")]
    Transport { path: String, message: String },
}

impl FetchError {
    /// The asset path that failed to resolve.
    pub fn path(&self) -> &str {
        match self {
            FetchError::NotFound { path }
            | FetchError::Io { path, .. }
            | FetchError::Transport { path, .. } => path,
        }
    }
}

/// Result type for resolver operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// A successfully resolved asset.
#[derive(Clone, Debug)]
pub struct ResolvedAsset {
    /// Canonical identifier of the asset
    pub uri: String,

    /// Asset content
    pub bytes: AssetBytes,
}

impl ResolvedAsset {
    pub fn new(uri: impl Into<String>, bytes: AssetBytes) -> Self {
        Self {
            uri: uri.into(),
            bytes,
        }
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Maps logical asset paths to bytes, with caching.
///
/// `resolve` is the only suspension point and the only operation that may
/// touch the transport. Every successful resolve must populate the cache
/// before returning. The cache probes (`has_asset`, `get_asset`) never fall
/// back to the transport and never fail.
///
/// Futures are not required to be `Send`; composition runs on a single task.
#[async_trait(?Send)]
pub trait AssetResolver {
    /// Resolve an asset path to its canonical URI and bytes.
    async fn resolve(&self, asset_path: &str) -> FetchResult<ResolvedAsset>;

    /// Pre-populate the cache with bytes for `uri`.
    fn set_asset(&self, uri: &str, bytes: AssetBytes);

    /// Cached bytes for `uri`, if any.
    fn get_asset(&self, uri: &str) -> Option<AssetBytes>;

    /// Whether `uri` is cached.
    fn has_asset(&self, uri: &str) -> bool {
        self.get_asset(uri).is_some()
    }
}

/// Normalize a declared asset path token.
///
/// Strips surrounding whitespace, USD `@` delimiters and leading `./`
/// segments. The result is what resolvers and layers key their lookups on.
pub fn normalize_asset_path(asset_path: &str) -> String {
    let unified = asset_path.trim().trim_matches('@').trim().replace('\\', "/");
    let mut path = unified.as_str();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.to_string()
}
