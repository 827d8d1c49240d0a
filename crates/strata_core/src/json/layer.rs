//! `Layer` implementation over a JSON layer document.

use std::collections::{HashMap, HashSet};

use super::document::{reroot, LayerDocument, PrimSpec, VariantSet};
use crate::asset::{normalize_asset_path, AssetBytes};
use crate::layer::{CompositionKind, Layer, LayerError};

/// A JSON layer and its composition state.
///
/// Composition operators mutate the document in place. Assets an operator
/// needs must be staged with [`Layer::set_asset`] first; operators never
/// fetch anything themselves.
#[derive(Debug)]
pub struct JsonLayer {
    uri: String,
    document: LayerDocument,
    staged: HashMap<String, AssetBytes>,
    error: String,
    skipped_sublayers: Vec<String>,
}

impl JsonLayer {
    pub fn new(uri: impl Into<String>, document: LayerDocument) -> Self {
        Self {
            uri: uri.into(),
            document,
            staged: HashMap::new(),
            error: String::new(),
            skipped_sublayers: Vec::new(),
        }
    }

    /// Parse a layer from raw bytes.
    pub fn from_bytes(uri: &str, bytes: &[u8]) -> Result<Self, LayerError> {
        let document = LayerDocument::from_slice(bytes).map_err(|source| LayerError::Parse {
            uri: uri.to_string(),
            source,
        })?;
        Ok(Self::new(uri, document))
    }

    /// URI the layer was loaded from.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn document(&self) -> &LayerDocument {
        &self.document
    }

    /// Look up a prim by path.
    pub fn prim(&self, path: &str) -> Option<&PrimSpec> {
        self.document.prims.get(path)
    }

    pub fn prim_count(&self) -> usize {
        self.document.prims.len()
    }

    /// Sublayers that were declared but never staged, so were left out.
    pub fn skipped_sublayers(&self) -> &[String] {
        &self.skipped_sublayers
    }

    fn fail(&mut self, message: String) -> bool {
        log::debug!("Layer '{}': {}", self.uri, message);
        self.error = message;
        false
    }

    /// Parse the staged asset for `asset_path`, or `None` if nothing was staged.
    fn staged_document(&self, asset_path: &str) -> Result<Option<LayerDocument>, String> {
        let Some(bytes) = self.staged.get(&normalize_asset_path(asset_path)) else {
            return Ok(None);
        };
        LayerDocument::from_slice(bytes)
            .map(Some)
            .map_err(|e| format!("Failed to parse staged layer '{}': {}", asset_path, e))
    }

    /// All arcs of `kind` across prims, in path order, without duplicates.
    fn collect_arcs(&self, kind: CompositionKind) -> Vec<String> {
        let mut seen = HashSet::new();
        self.document
            .prims
            .values()
            .flat_map(|prim| prim.arcs(kind).iter())
            .filter(|path| seen.insert((*path).clone()))
            .cloned()
            .collect()
    }

    fn any_prim(&self, predicate: impl Fn(&PrimSpec) -> bool) -> bool {
        self.document.prims.values().any(predicate)
    }

    /// Merge one staged sublayer and its own sublayers beneath the document.
    ///
    /// Merged depth-first in declaration order, so each sublayer's subtree
    /// sits between it and its next sibling in strength.
    fn merge_sublayer(&mut self, asset_path: &str, visited: &mut HashSet<String>) -> Result<(), String> {
        if !visited.insert(normalize_asset_path(asset_path)) {
            return Ok(());
        }

        let Some(sublayer) = self.staged_document(asset_path)? else {
            log::warn!(
                "Sublayer '{}' of '{}' was never staged; leaving it out",
                asset_path,
                self.uri
            );
            self.skipped_sublayers.push(asset_path.to_string());
            return Ok(());
        };

        self.document.merge_weaker(&sublayer);
        for nested in &sublayer.sub_layers {
            self.merge_sublayer(nested, visited)?;
        }
        Ok(())
    }

    /// Collect class specs reachable from `class_path`, strongest first.
    fn class_chain(
        &self,
        derived: &str,
        class_path: &str,
        visited: &mut HashSet<String>,
        chain: &mut Vec<PrimSpec>,
    ) -> Result<(), String> {
        if !visited.insert(class_path.to_string()) {
            return Ok(());
        }
        let class = self.document.prims.get(class_path).ok_or_else(|| {
            format!(
                "Prim '{}' inherits from unknown class '{}'",
                derived, class_path
            )
        })?;
        chain.push(class.clone());
        for parent in &class.inherits {
            self.class_chain(derived, parent, visited, chain)?;
        }
        Ok(())
    }

    /// Shared implementation of references and payloads.
    ///
    /// Each target layer's root prim and its descendants are re-rooted under
    /// the declaring prim, beneath the prim's own opinions. Arcs the target
    /// prim declares become pending on the declaring prim.
    fn compose_namespace_arcs(&mut self, kind: CompositionKind) -> bool {
        let targets: Vec<(String, Vec<String>)> = self
            .document
            .prims
            .iter_mut()
            .filter(|(_, prim)| !prim.arcs(kind).is_empty())
            .map(|(path, prim)| (path.clone(), prim.take_arcs(kind)))
            .collect();

        for (prim_path, asset_paths) in targets {
            for asset_path in asset_paths {
                let target = match self.staged_document(&asset_path) {
                    Ok(Some(document)) => document,
                    Ok(None) => {
                        return self.fail(format!(
                            "{} target '{}' of '{}' was not staged",
                            kind, asset_path, prim_path
                        ))
                    }
                    Err(message) => return self.fail(message),
                };

                let Some(source_root) = target.root_prim_path() else {
                    return self.fail(format!(
                        "{} target '{}' of '{}' has no root prim",
                        kind, asset_path, prim_path
                    ));
                };

                for (path, spec) in &target.prims {
                    let Some(destination) = reroot(path, &source_root, &prim_path) else {
                        continue;
                    };
                    let mut spec = spec.clone();
                    spec.inherits = spec
                        .inherits
                        .iter()
                        .map(|class| reroot(class, &source_root, &prim_path).unwrap_or_else(|| class.clone()))
                        .collect();
                    self.document.merge_prim_weaker(destination, &spec);
                }

                log::debug!(
                    "Composed {} '{}' onto '{}' (root '{}')",
                    kind,
                    asset_path,
                    prim_path,
                    source_root
                );
            }
        }
        true
    }
}

fn apply_variant_sets(
    prim: &mut PrimSpec,
    prim_path: &str,
    sets: &std::collections::BTreeMap<String, VariantSet>,
) -> Result<(), String> {
    for (set_name, set) in sets {
        let Some(selection) = &set.selection else {
            log::debug!("Variant set '{}' on '{}' has no selection", set_name, prim_path);
            continue;
        };
        let variant = set.variants.get(selection).ok_or_else(|| {
            format!(
                "Variant set '{}' on '{}' has no variant '{}'",
                set_name, prim_path, selection
            )
        })?;
        prim.apply_variant(variant);
    }
    Ok(())
}

impl Layer for JsonLayer {
    fn has_sublayers(&self) -> bool {
        !self.document.sub_layers.is_empty()
    }

    fn sublayer_asset_paths(&self) -> Vec<String> {
        self.document.sub_layers.clone()
    }

    fn has_references(&self) -> bool {
        self.any_prim(|prim| !prim.references.is_empty())
    }

    fn reference_asset_paths(&self) -> Vec<String> {
        self.collect_arcs(CompositionKind::References)
    }

    fn has_payloads(&self) -> bool {
        self.any_prim(|prim| !prim.payloads.is_empty())
    }

    fn payload_asset_paths(&self) -> Vec<String> {
        self.collect_arcs(CompositionKind::Payloads)
    }

    fn has_inherits(&self) -> bool {
        self.any_prim(|prim| !prim.inherits.is_empty())
    }

    fn has_variants(&self) -> bool {
        self.any_prim(|prim| !prim.variant_sets.is_empty())
    }

    fn compose_sublayers(&mut self) -> bool {
        let sublayers = std::mem::take(&mut self.document.sub_layers);
        let mut visited = HashSet::new();
        visited.insert(normalize_asset_path(&self.uri));

        for asset_path in &sublayers {
            if let Err(message) = self.merge_sublayer(asset_path, &mut visited) {
                return self.fail(message);
            }
        }
        true
    }

    fn compose_inherits(&mut self) -> bool {
        let derived: Vec<String> = self
            .document
            .prims
            .iter()
            .filter(|(_, prim)| !prim.inherits.is_empty())
            .map(|(path, _)| path.clone())
            .collect();

        for path in derived {
            let inherits = self
                .document
                .prims
                .get_mut(&path)
                .map(|prim| prim.take_arcs(CompositionKind::Inherits))
                .unwrap_or_default();

            let mut visited = HashSet::from([path.clone()]);
            let mut chain = Vec::new();
            for class_path in &inherits {
                if let Err(message) = self.class_chain(&path, class_path, &mut visited, &mut chain) {
                    return self.fail(message);
                }
            }

            if let Some(prim) = self.document.prims.get_mut(&path) {
                for class in &chain {
                    prim.merge_opinions(class);
                }
            }
        }
        true
    }

    fn compose_variants(&mut self) -> bool {
        let paths: Vec<String> = self
            .document
            .prims
            .iter()
            .filter(|(_, prim)| !prim.variant_sets.is_empty())
            .map(|(path, _)| path.clone())
            .collect();

        for path in paths {
            let Some(prim) = self.document.prims.get_mut(&path) else {
                continue;
            };
            let sets = std::mem::take(&mut prim.variant_sets);
            if let Err(message) = apply_variant_sets(prim, &path, &sets) {
                return self.fail(message);
            }
        }
        true
    }

    fn compose_references(&mut self) -> bool {
        self.compose_namespace_arcs(CompositionKind::References)
    }

    fn compose_payloads(&mut self) -> bool {
        self.compose_namespace_arcs(CompositionKind::Payloads)
    }

    fn set_asset(&mut self, uri: &str, bytes: AssetBytes) {
        self.staged.insert(normalize_asset_path(uri), bytes);
    }

    fn error(&self) -> String {
        self.error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn layer(json: &str) -> JsonLayer {
        JsonLayer::from_bytes("root.json", json.as_bytes()).unwrap()
    }

    fn stage(layer: &mut JsonLayer, uri: &str, json: &str) {
        layer.set_asset(uri, AssetBytes::from(json.as_bytes()));
    }

    #[test]
    fn test_queries_on_plain_layer() {
        let layer = layer(r#"{ "prims": { "/World": { "type": "Xform" } } }"#);
        assert!(!layer.has_sublayers());
        assert!(!layer.has_pending_arcs());
        assert!(layer.reference_asset_paths().is_empty());
        assert_eq!(layer.prim_count(), 1);
    }

    #[test]
    fn test_malformed_bytes() {
        let err = JsonLayer::from_bytes("bad.json", b"{ nope").unwrap_err();
        assert!(matches!(err, LayerError::Parse { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_compose_sublayers_strength_order() {
        let mut root = layer(
            r#"{
                "subLayers": ["./strong.json", "weak.json"],
                "prims": { "/Shared": { "attributes": { "owner": "root" } } }
            }"#,
        );
        stage(
            &mut root,
            "strong.json",
            r#"{ "subLayers": ["nested.json"], "prims": { "/Shared": { "attributes": { "owner": "strong", "color": "red" } } } }"#,
        );
        stage(
            &mut root,
            "nested.json",
            r#"{ "prims": { "/Shared": { "attributes": { "color": "green", "size": 2 } } } }"#,
        );
        stage(
            &mut root,
            "weak.json",
            r#"{ "prims": { "/Shared": { "attributes": { "size": 3 } }, "/FromWeak": {} } }"#,
        );

        assert!(root.compose_sublayers());
        assert!(!root.has_sublayers());

        let shared = root.prim("/Shared").unwrap();
        assert_eq!(shared.attributes["owner"], Value::from("root"));
        assert_eq!(shared.attributes["color"], Value::from("red"));
        // nested.json is stronger than weak.json: it sits under strong.json
        assert_eq!(shared.attributes["size"], Value::from(2));
        assert!(root.prim("/FromWeak").is_some());
    }

    #[test]
    fn test_unstaged_sublayer_is_skipped() {
        let mut root = layer(r#"{ "subLayers": ["missing.json"], "prims": { "/A": {} } }"#);
        assert!(root.compose_sublayers());
        assert_eq!(root.skipped_sublayers().to_vec(), vec!["missing.json"]);
        assert!(root.prim("/A").is_some());
    }

    #[test]
    fn test_compose_inherits_follows_class_chain() {
        let mut root = layer(
            r#"{ "prims": {
                "/_class_Base": { "attributes": { "material": "steel", "size": 1 } },
                "/_class_Chair": { "type": "Xform", "inherits": ["/_class_Base"], "attributes": { "legs": 4 } },
                "/Chair": { "inherits": ["/_class_Chair"], "attributes": { "size": 2 } }
            } }"#,
        );
        assert!(root.has_inherits());
        assert!(root.compose_inherits());
        assert!(!root.has_inherits());

        let chair = root.prim("/Chair").unwrap();
        assert_eq!(chair.type_name.as_deref(), Some("Xform"));
        assert_eq!(chair.attributes["legs"], Value::from(4));
        assert_eq!(chair.attributes["material"], Value::from("steel"));
        assert_eq!(chair.attributes["size"], Value::from(2));
    }

    #[test]
    fn test_compose_inherits_unknown_class_fails() {
        let mut root = layer(r#"{ "prims": { "/Chair": { "inherits": ["/_class_Nope"] } } }"#);
        assert!(!root.compose_inherits());
        assert!(root.error().contains("/_class_Nope"));
    }

    #[test]
    fn test_compose_variants_adds_arcs() {
        let mut root = layer(
            r#"{ "prims": { "/Chair": {
                "attributes": { "color": "white" },
                "variantSets": { "lod": { "selection": "high", "variants": {
                    "high": { "attributes": { "color": "black", "detail": "high" }, "payloads": ["chair_high.json"] },
                    "low": { "attributes": { "detail": "low" } }
                } } }
            } } }"#,
        );
        assert!(!root.has_payloads());
        assert!(root.compose_variants());
        assert!(!root.has_variants());
        assert!(root.has_payloads());

        let chair = root.prim("/Chair").unwrap();
        assert_eq!(chair.attributes["color"], Value::from("white"));
        assert_eq!(chair.attributes["detail"], Value::from("high"));
        assert_eq!(root.payload_asset_paths(), vec!["chair_high.json"]);
    }

    #[test]
    fn test_compose_variants_unknown_selection_fails() {
        let mut root = layer(
            r#"{ "prims": { "/Chair": { "variantSets": { "lod": { "selection": "mid", "variants": { "high": {} } } } } } }"#,
        );
        assert!(!root.compose_variants());
        assert!(root.error().contains("'mid'"));
    }

    #[test]
    fn test_compose_references_reroots_target() {
        let mut root = layer(
            r#"{ "prims": { "/World/Chair": { "references": ["chair.json"], "attributes": { "height": 2 } } } }"#,
        );
        stage(
            &mut root,
            "chair.json",
            r#"{ "defaultPrim": "Chair", "prims": {
                "/Chair": { "type": "Xform", "attributes": { "height": 1, "legs": 4 }, "payloads": ["cushion.json"] },
                "/Chair/Seat": { "type": "Mesh" },
                "/Unrelated": {}
            } }"#,
        );

        assert_eq!(root.reference_asset_paths(), vec!["chair.json"]);
        assert!(root.compose_references());
        assert!(!root.has_references());

        let chair = root.prim("/World/Chair").unwrap();
        assert_eq!(chair.type_name.as_deref(), Some("Xform"));
        assert_eq!(chair.attributes["height"], Value::from(2));
        assert_eq!(chair.attributes["legs"], Value::from(4));
        assert!(root.prim("/World/Chair/Seat").is_some());
        assert!(root.prim("/Unrelated").is_none());

        // The target's own payload is now pending on the referencing prim
        assert_eq!(root.payload_asset_paths(), vec!["cushion.json"]);
    }

    #[test]
    fn test_compose_references_requires_staging() {
        let mut root = layer(r#"{ "prims": { "/A": { "references": ["a.json"] } } }"#);
        assert!(!root.compose_references());
        assert!(root.error().contains("was not staged"));
    }
}
