//! Layer engine for JSON layer documents.

use async_trait::async_trait;

use super::layer::JsonLayer;
use crate::asset::AssetBytes;
use crate::layer::{LayerEngine, LayerError};

/// USDC crate files start with this magic.
const USDC_MAGIC: &[u8] = b"PXR-USDC";

/// USDZ archives are zip files.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Loads [`JsonLayer`]s from raw bytes.
///
/// Native USD payloads (`.usdc`, `.usdz`, `#usda` text) are recognized by
/// their header and rejected as unsupported rather than reported as JSON
/// syntax errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonLayerEngine;

impl JsonLayerEngine {
    pub fn new() -> Self {
        Self
    }

    /// Parse `bytes` synchronously.
    pub fn load_sync(&self, uri: &str, bytes: &[u8]) -> Result<JsonLayer, LayerError> {
        if is_native_usd(bytes) {
            return Err(LayerError::Unsupported {
                uri: uri.to_string(),
            });
        }
        JsonLayer::from_bytes(uri, bytes)
    }
}

#[async_trait(?Send)]
impl LayerEngine for JsonLayerEngine {
    type Layer = JsonLayer;

    async fn load(&self, uri: &str, bytes: AssetBytes) -> Result<JsonLayer, LayerError> {
        self.load_sync(uri, &bytes)
    }
}

fn is_native_usd(bytes: &[u8]) -> bool {
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|start| &bytes[start..])
        .unwrap_or(&[]);
    bytes.starts_with(USDC_MAGIC) || bytes.starts_with(ZIP_MAGIC) || trimmed.starts_with(b"#usda")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;

    #[test]
    fn test_load_json_layer() {
        let engine = JsonLayerEngine::new();
        let bytes = AssetBytes::from(&br#"{ "subLayers": ["a.json"] }"#[..]);
        let layer = pollster::block_on(engine.load("root.json", bytes)).unwrap();
        assert_eq!(layer.uri(), "root.json");
        assert!(layer.has_sublayers());
    }

    #[test]
    fn test_native_usd_is_unsupported() {
        let engine = JsonLayerEngine::new();
        for header in [&b"PXR-USDC\x00\x00"[..], &b"PK\x03\x04rest"[..], &b"\n#usda 1.0\n"[..]] {
            let err = engine.load_sync("scene.usd", header).unwrap_err();
            assert!(matches!(err, LayerError::Unsupported { .. }));
        }
    }
}
