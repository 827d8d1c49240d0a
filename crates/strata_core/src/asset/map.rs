//! Per-run record of resolved assets.

use std::collections::HashMap;

use thiserror::Error;

use super::resolver::{AssetBytes, ResolvedAsset};
use crate::layer::Layer;

/// A declared asset path resolved to two different URIs within one run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Asset path '{asset_path}' resolved to both '{first}' and '{second}'")]
pub struct AssetConflict {
    pub asset_path: String,
    pub first: String,
    pub second: String,
}

/// One resolved asset and the declared paths that led to it.
#[derive(Clone, Debug)]
pub struct AssetEntry {
    /// Canonical URI reported by the resolver
    pub uri: String,

    /// Asset content
    pub bytes: AssetBytes,

    /// Declared asset path tokens that resolved to this URI
    pub asset_paths: Vec<String>,
}

/// Mapping from resolved URI to bytes, accumulated during one composition run.
///
/// Entries are only ever added. The map also remembers which declared asset
/// path produced each URI: layers look assets up by the token they declared,
/// so staging writes both the URI and every alias. A token that resolves to
/// two different URIs in the same run is rejected, since the layer could
/// not tell the two apart.
#[derive(Clone, Debug, Default)]
pub struct AssetMap {
    entries: HashMap<String, AssetEntry>,
    aliases: HashMap<String, String>,
}

impl AssetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `asset_path` resolved to `asset`.
    pub fn record(&mut self, asset_path: &str, asset: &ResolvedAsset) -> Result<(), AssetConflict> {
        if let Some(existing) = self.aliases.get(asset_path) {
            if existing != &asset.uri {
                return Err(AssetConflict {
                    asset_path: asset_path.to_string(),
                    first: existing.clone(),
                    second: asset.uri.clone(),
                });
            }
        }
        self.aliases
            .insert(asset_path.to_string(), asset.uri.clone());

        let entry = self
            .entries
            .entry(asset.uri.clone())
            .or_insert_with(|| AssetEntry {
                uri: asset.uri.clone(),
                bytes: asset.bytes.clone(),
                asset_paths: Vec::new(),
            });
        if !entry.asset_paths.iter().any(|p| p == asset_path) {
            entry.asset_paths.push(asset_path.to_string());
        }
        Ok(())
    }

    /// Bytes recorded for `uri`.
    pub fn get(&self, uri: &str) -> Option<&AssetBytes> {
        self.entries.get(uri).map(|entry| &entry.bytes)
    }

    /// URI a declared asset path resolved to.
    pub fn uri_for(&self, asset_path: &str) -> Option<&str> {
        self.aliases.get(asset_path).map(String::as_str)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    /// Number of distinct URIs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetEntry> {
        self.entries.values()
    }

    /// Total payload size across all entries.
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(|entry| entry.bytes.len()).sum()
    }

    /// Stage every recorded asset into `layer`.
    pub fn stage_into<L: Layer + ?Sized>(&self, layer: &mut L) {
        for entry in self.entries.values() {
            Self::stage_entry(entry, layer);
        }
    }

    /// Stage the assets the given declared paths resolved to.
    ///
    /// Paths that were never recorded are skipped.
    pub fn stage_paths_into<L: Layer + ?Sized>(&self, asset_paths: &[String], layer: &mut L) {
        for asset_path in asset_paths {
            if let Some(entry) = self
                .uri_for(asset_path)
                .and_then(|uri| self.entries.get(uri))
            {
                Self::stage_entry(entry, layer);
            }
        }
    }

    fn stage_entry<L: Layer + ?Sized>(entry: &AssetEntry, layer: &mut L) {
        layer.set_asset(&entry.uri, entry.bytes.clone());
        for alias in entry.asset_paths.iter().filter(|alias| **alias != entry.uri) {
            layer.set_asset(alias, entry.bytes.clone());
        }
    }
}
