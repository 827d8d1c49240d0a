use thiserror::Error;

use crate::asset::{AssetConflict, FetchError};
use crate::layer::{CompositionKind, LayerError};
use crate::scene::ProjectionError;

/// Errors that abort a composition run.
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("Composition is not ready: {0}")]
    NotReady(&'static str),

    #[error("Failed to fetch root layer: {source}")]
    RootFetch {
        #[source]
        source: FetchError,
    },

    #[error("Failed to load root layer '{asset_path}': {source}")]
    RootLoad {
        asset_path: String,
        #[source]
        source: LayerError,
    },

    #[error("Failed to fetch {kind} asset: {source}")]
    Fetch {
        kind: CompositionKind,
        #[source]
        source: FetchError,
    },

    #[error("Failed to load {kind} layer '{asset_path}': {source}")]
    Load {
        kind: CompositionKind,
        asset_path: String,
        #[source]
        source: LayerError,
    },

    #[error("Composing {kind} failed: {message}")]
    CompositionOperator {
        kind: CompositionKind,
        message: String,
    },

    #[error("Sublayer '{asset_path}' is nested deeper than the limit of {max_depth}")]
    RecursionDepthExceeded { max_depth: usize, asset_path: String },

    #[error("Composition did not converge after {iterations} iterations (pending: {})", kind_list(.pending))]
    DidNotConverge {
        iterations: usize,
        pending: Vec<CompositionKind>,
    },

    #[error(transparent)]
    AssetPathConflict(#[from] AssetConflict),

    #[error("Scene projection failed: {0}")]
    Projection(#[from] ProjectionError),
}

impl CompositionError {
    /// The composition kind the failure happened in, if any.
    ///
    /// Root layer failures happen before any kind is composed.
    pub fn kind(&self) -> Option<CompositionKind> {
        match self {
            CompositionError::Fetch { kind, .. }
            | CompositionError::Load { kind, .. }
            | CompositionError::CompositionOperator { kind, .. } => Some(*kind),
            CompositionError::RecursionDepthExceeded { .. } => Some(CompositionKind::Sublayers),
            _ => None,
        }
    }

    /// The asset path the failure is attributed to, if any.
    pub fn asset_path(&self) -> Option<&str> {
        match self {
            CompositionError::Fetch { source, .. } | CompositionError::RootFetch { source } => {
                Some(source.path())
            }
            CompositionError::Load { asset_path, .. }
            | CompositionError::RootLoad { asset_path, .. }
            | CompositionError::RecursionDepthExceeded { asset_path, .. } => Some(asset_path),
            CompositionError::AssetPathConflict(conflict) => Some(&conflict.asset_path),
            _ => None,
        }
    }
}

/// Result type for composition operations.
pub type CompositionResult<T> = Result<T, CompositionError>;

fn kind_list(kinds: &[CompositionKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_not_converge_message_lists_pending() {
        let err = CompositionError::DidNotConverge {
            iterations: 16,
            pending: vec![CompositionKind::References, CompositionKind::Payloads],
        };
        assert_eq!(
            err.to_string(),
            "Composition did not converge after 16 iterations (pending: references, payloads)"
        );
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_fetch_error_context() {
        let err = CompositionError::Fetch {
            kind: CompositionKind::References,
            source: FetchError::NotFound {
                path: "props/lamp.json".to_string(),
            },
        };
        assert_eq!(err.kind(), Some(CompositionKind::References));
        assert_eq!(err.asset_path(), Some("props/lamp.json"));
        assert!(err.to_string().contains("references"));
    }

    #[test]
    fn test_root_fetch_has_no_kind() {
        let err = CompositionError::RootFetch {
            source: FetchError::NotFound {
                path: "shot.json".to_string(),
            },
        };
        assert_eq!(err.kind(), None);
        assert_eq!(err.asset_path(), Some("shot.json"));
        assert!(err.to_string().starts_with("Failed to fetch root layer"));
        assert!(!err.to_string().contains("sublayers"));
    }
}
