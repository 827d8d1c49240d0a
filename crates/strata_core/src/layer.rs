//! Layer capability interface.
//!
//! A layer backend (a native USD engine, the bundled JSON engine, a test
//! fake) exposes the same fixed set of queries and composition operators.
//! The composer only ever talks to layers through these traits.
//!
//! Composition operators report success as a `bool` and keep the failure
//! detail on the layer, retrievable through [`Layer::error`]. This matches
//! how native layer engines report errors across an FFI boundary; the
//! composer turns a `false` into a typed [`CompositionError`].
//!
//! [`CompositionError`]: crate::compose::CompositionError

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::asset::AssetBytes;

/// The kinds of composition arc a layer can declare.
///
/// Variants are listed in the order the composer processes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompositionKind {
    Sublayers,
    Inherits,
    Variants,
    References,
    Payloads,
}

impl CompositionKind {
    /// Kinds handled by the bounded fixpoint loop.
    pub const ARCS: [CompositionKind; 4] = [
        CompositionKind::Inherits,
        CompositionKind::Variants,
        CompositionKind::References,
        CompositionKind::Payloads,
    ];

    /// Whether composing this kind needs assets fetched first.
    pub fn needs_assets(self) -> bool {
        matches!(
            self,
            CompositionKind::Sublayers | CompositionKind::References | CompositionKind::Payloads
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompositionKind::Sublayers => "sublayers",
            CompositionKind::Inherits => "inherits",
            CompositionKind::Variants => "variants",
            CompositionKind::References => "references",
            CompositionKind::Payloads => "payloads",
        }
    }
}

impl fmt::Display for CompositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors a layer engine reports while loading a layer.
#[derive(Error, Debug)]
pub enum LayerError {
    #[error("Failed to parse layer '{uri}': {source}")]
    Parse {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported layer format for '{uri}'")]
    Unsupported { uri: String },
}

/// A parsed layer plus its mutable composition state.
pub trait Layer {
    fn has_sublayers(&self) -> bool;

    /// Sublayer asset paths declared directly on this layer, strongest first.
    fn sublayer_asset_paths(&self) -> Vec<String>;

    fn has_references(&self) -> bool;

    fn reference_asset_paths(&self) -> Vec<String>;

    fn has_payloads(&self) -> bool;

    fn payload_asset_paths(&self) -> Vec<String>;

    fn has_inherits(&self) -> bool;

    fn has_variants(&self) -> bool;

    /// Merge every staged sublayer beneath this layer.
    fn compose_sublayers(&mut self) -> bool;

    /// Apply inherited class opinions. Performs no asset I/O.
    fn compose_inherits(&mut self) -> bool;

    /// Apply the selected variants. Performs no asset I/O.
    fn compose_variants(&mut self) -> bool;

    /// Merge staged reference targets into the referencing prims.
    fn compose_references(&mut self) -> bool;

    /// Merge staged payload targets into the declaring prims.
    fn compose_payloads(&mut self) -> bool;

    /// Stage bytes for an asset an operator will look up by `uri`.
    fn set_asset(&mut self, uri: &str, bytes: AssetBytes);

    /// Detail of the most recent operator failure.
    fn error(&self) -> String;

    /// Whether the layer declares any arc of `kind`.
    fn has(&self, kind: CompositionKind) -> bool {
        match kind {
            CompositionKind::Sublayers => self.has_sublayers(),
            CompositionKind::Inherits => self.has_inherits(),
            CompositionKind::Variants => self.has_variants(),
            CompositionKind::References => self.has_references(),
            CompositionKind::Payloads => self.has_payloads(),
        }
    }

    /// Asset paths to fetch before composing `kind`.
    ///
    /// Empty for kinds that never touch assets.
    fn asset_paths(&self, kind: CompositionKind) -> Vec<String> {
        match kind {
            CompositionKind::Sublayers => self.sublayer_asset_paths(),
            CompositionKind::References => self.reference_asset_paths(),
            CompositionKind::Payloads => self.payload_asset_paths(),
            CompositionKind::Inherits | CompositionKind::Variants => Vec::new(),
        }
    }

    /// Run the composition operator for `kind`.
    fn compose(&mut self, kind: CompositionKind) -> bool {
        match kind {
            CompositionKind::Sublayers => self.compose_sublayers(),
            CompositionKind::Inherits => self.compose_inherits(),
            CompositionKind::Variants => self.compose_variants(),
            CompositionKind::References => self.compose_references(),
            CompositionKind::Payloads => self.compose_payloads(),
        }
    }

    /// Fixpoint-loop kinds that still have work pending.
    fn pending_kinds(&self) -> Vec<CompositionKind> {
        CompositionKind::ARCS
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }

    /// Whether any fixpoint-loop kind still has work pending.
    fn has_pending_arcs(&self) -> bool {
        CompositionKind::ARCS.into_iter().any(|kind| self.has(kind))
    }
}

/// Turns raw asset bytes into layers.
#[async_trait(?Send)]
pub trait LayerEngine {
    type Layer: Layer;

    /// Parse `bytes` fetched from `uri` into a fresh, uncomposed layer.
    async fn load(&self, uri: &str, bytes: AssetBytes) -> Result<Self::Layer, LayerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order_matches_livrps() {
        let mut kinds = vec![
            CompositionKind::Payloads,
            CompositionKind::Inherits,
            CompositionKind::References,
            CompositionKind::Sublayers,
            CompositionKind::Variants,
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                CompositionKind::Sublayers,
                CompositionKind::Inherits,
                CompositionKind::Variants,
                CompositionKind::References,
                CompositionKind::Payloads,
            ]
        );
    }

    #[test]
    fn test_needs_assets() {
        assert!(CompositionKind::References.needs_assets());
        assert!(!CompositionKind::Inherits.needs_assets());
        assert_eq!(CompositionKind::Payloads.to_string(), "payloads");
    }
}
