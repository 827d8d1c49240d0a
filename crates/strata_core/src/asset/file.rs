//! Filesystem asset resolver.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::cache::AssetCache;
use super::resolver::{
    normalize_asset_path, AssetBytes, AssetResolver, FetchError, FetchResult, ResolvedAsset,
};

/// Resolves asset paths relative to a base directory.
///
/// Relative paths are joined onto the base directory, absolute paths are
/// used as-is. The canonical URI is the joined path with forward slashes, so
/// the same file declared as `./geo.json` and `geo.json` shares one cache
/// entry.
///
/// Files are read with blocking `std::fs` calls, so `resolve` finishes on
/// its first poll. Sibling fetches joined by the composer therefore read
/// one file after another. That suits a single-threaded executor such as
/// `pollster`; wrap the resolver if reads should overlap.
#[derive(Debug)]
pub struct FileResolver {
    base_dir: PathBuf,
    cache: AssetCache,
}

impl FileResolver {
    /// Create a resolver rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: AssetCache::new(),
        }
    }

    /// Create a resolver rooted at the directory containing `layer_path`.
    pub fn for_layer(layer_path: impl AsRef<Path>) -> Self {
        let base_dir = layer_path
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Map an asset path to the file it names.
    pub fn file_path(&self, asset_path: &str) -> PathBuf {
        let clean = normalize_asset_path(asset_path);
        let path = Path::new(&clean);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn uri_for(&self, asset_path: &str) -> String {
        self.file_path(asset_path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[async_trait(?Send)]
impl AssetResolver for FileResolver {
    async fn resolve(&self, asset_path: &str) -> FetchResult<ResolvedAsset> {
        let uri = self.uri_for(asset_path);

        if let Some(bytes) = self.cache.get(&uri) {
            return Ok(ResolvedAsset::new(uri, bytes));
        }

        let file_path = self.file_path(asset_path);
        let content = std::fs::read(&file_path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound {
                    path: asset_path.to_string(),
                }
            } else {
                FetchError::Io {
                    path: asset_path.to_string(),
                    source,
                }
            }
        })?;

        let bytes = AssetBytes::from(content);
        self.cache.insert(&uri, bytes.clone());
        log::debug!("Read '{}' ({} bytes)", file_path.display(), bytes.len());

        Ok(ResolvedAsset::new(uri, bytes))
    }

    fn set_asset(&self, uri: &str, bytes: AssetBytes) {
        self.cache.insert(uri, bytes);
    }

    fn get_asset(&self, uri: &str) -> Option<AssetBytes> {
        self.cache.get(uri)
    }
}
