//! JSON layer document types.
//!
//! These types are the parsed form of a layer before and during composition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layer::CompositionKind;

/// A parsed layer document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerDocument {
    /// Name or path of the prim references to this layer target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_prim: Option<String>,

    /// Sublayer asset paths, strongest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_layers: Vec<String>,

    /// Prim specs keyed by absolute prim path
    pub prims: BTreeMap<String, PrimSpec>,
}

impl LayerDocument {
    /// Parse a document from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Serialize the document to pretty-printed JSON.
    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Path of the prim a reference or payload to this layer brings in.
    ///
    /// The declared default prim if it exists, otherwise the first root prim
    /// in path order.
    pub fn root_prim_path(&self) -> Option<String> {
        if let Some(name) = &self.default_prim {
            let path = if name.starts_with('/') {
                name.clone()
            } else {
                format!("/{}", name)
            };
            return self.prims.contains_key(&path).then_some(path);
        }

        self.prims.keys().find(|path| is_root_path(path)).cloned()
    }

    /// Merge `weaker` beneath this document.
    ///
    /// Prims missing here are copied over, prims present here only gain
    /// opinions they do not author themselves.
    pub fn merge_weaker(&mut self, weaker: &LayerDocument) {
        if self.default_prim.is_none() {
            self.default_prim = weaker.default_prim.clone();
        }
        for (path, spec) in &weaker.prims {
            self.merge_prim_weaker(path.clone(), spec);
        }
    }

    /// Merge a single weaker prim spec at `path`.
    pub fn merge_prim_weaker(&mut self, path: String, weaker: &PrimSpec) {
        match self.prims.get_mut(&path) {
            Some(existing) => existing.merge_weaker(weaker),
            None => {
                self.prims.insert(path, weaker.clone());
            }
        }
    }
}

/// A prim: its opinions and the arcs it declares.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrimSpec {
    /// Schema type name (e.g., "Xform", "Mesh")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    /// Attribute opinions
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,

    /// Referenced layer asset paths, strongest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    /// Payload layer asset paths, strongest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payloads: Vec<String>,

    /// Class prim paths in this layer, strongest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<String>,

    /// Variant sets keyed by set name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variant_sets: BTreeMap<String, VariantSet>,
}

impl PrimSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Asset paths or class paths declared for `kind`.
    pub fn arcs(&self, kind: CompositionKind) -> &[String] {
        match kind {
            CompositionKind::References => &self.references,
            CompositionKind::Payloads => &self.payloads,
            CompositionKind::Inherits => &self.inherits,
            CompositionKind::Sublayers | CompositionKind::Variants => &[],
        }
    }

    /// Remove and return the arcs declared for `kind`.
    pub fn take_arcs(&mut self, kind: CompositionKind) -> Vec<String> {
        match kind {
            CompositionKind::References => std::mem::take(&mut self.references),
            CompositionKind::Payloads => std::mem::take(&mut self.payloads),
            CompositionKind::Inherits => std::mem::take(&mut self.inherits),
            CompositionKind::Sublayers | CompositionKind::Variants => Vec::new(),
        }
    }

    /// Whether this prim still declares any arc.
    pub fn has_arcs(&self) -> bool {
        !self.references.is_empty()
            || !self.payloads.is_empty()
            || !self.inherits.is_empty()
            || !self.variant_sets.is_empty()
    }

    /// Take the type and attributes this prim does not author from `weaker`.
    pub fn merge_opinions(&mut self, weaker: &PrimSpec) {
        if self.type_name.is_none() {
            self.type_name = weaker.type_name.clone();
        }
        for (name, value) in &weaker.attributes {
            self.attributes
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Merge opinions and union the arcs of a weaker spec.
    pub fn merge_weaker(&mut self, weaker: &PrimSpec) {
        self.merge_opinions(weaker);
        union_into(&mut self.references, &weaker.references);
        union_into(&mut self.payloads, &weaker.payloads);
        union_into(&mut self.inherits, &weaker.inherits);
        for (name, set) in &weaker.variant_sets {
            self.variant_sets
                .entry(name.clone())
                .or_insert_with(|| set.clone());
        }
    }

    /// Apply a selected variant beneath this prim's own opinions.
    pub fn apply_variant(&mut self, variant: &VariantSpec) {
        for (name, value) in &variant.attributes {
            self.attributes
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        union_into(&mut self.references, &variant.references);
        union_into(&mut self.payloads, &variant.payloads);
    }
}

/// A named set of alternative opinions and its current selection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantSet {
    /// Selected variant name; nothing is applied when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,

    /// Variants keyed by name
    pub variants: BTreeMap<String, VariantSpec>,
}

/// Opinions and arcs contributed by one variant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantSpec {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payloads: Vec<String>,
}

/// Whether `path` names a prim directly under the pseudo-root.
pub fn is_root_path(path: &str) -> bool {
    path.len() > 1 && path.starts_with('/') && !path[1..].contains('/')
}

/// Move `path` from the namespace rooted at `from` to the one rooted at `to`.
///
/// Returns `None` when `path` is not `from` or one of its descendants.
pub fn reroot(path: &str, from: &str, to: &str) -> Option<String> {
    if path == from {
        return Some(to.to_string());
    }
    path.strip_prefix(from)
        .filter(|rest| rest.starts_with('/'))
        .map(|rest| format!("{}{}", to, rest))
}

fn union_into(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let json = br#"{
            "defaultPrim": "Chair",
            "subLayers": ["base.json"],
            "prims": {
                "/Chair": {
                    "type": "Xform",
                    "attributes": { "height": 1.5 },
                    "references": ["geo.json"],
                    "variantSets": {
                        "finish": { "selection": "oak", "variants": { "oak": { "attributes": { "color": "brown" } } } }
                    }
                }
            }
        }"#;

        let doc = LayerDocument::from_slice(json).unwrap();
        assert_eq!(doc.sub_layers, vec!["base.json"]);
        assert_eq!(doc.root_prim_path().as_deref(), Some("/Chair"));

        let chair = &doc.prims["/Chair"];
        assert_eq!(chair.type_name.as_deref(), Some("Xform"));
        assert_eq!(chair.arcs(CompositionKind::References).to_vec(), vec!["geo.json"]);
        assert_eq!(
            chair.variant_sets["finish"].selection.as_deref(),
            Some("oak")
        );
    }

    #[test]
    fn test_root_prim_fallback() {
        let mut doc = LayerDocument::default();
        doc.prims.insert("/Model/Geom".to_string(), PrimSpec::new("Mesh"));
        doc.prims.insert("/Model".to_string(), PrimSpec::new("Xform"));
        assert_eq!(doc.root_prim_path().as_deref(), Some("/Model"));

        doc.default_prim = Some("Missing".to_string());
        assert_eq!(doc.root_prim_path(), None);
    }

    #[test]
    fn test_stronger_opinion_wins() {
        let mut strong = PrimSpec::new("Xform").with_attribute("size", 1.0);
        let mut weak = PrimSpec::new("Mesh")
            .with_attribute("size", 2.0)
            .with_attribute("color", "red");
        weak.references.push("geo.json".to_string());
        strong.references.push("geo.json".to_string());

        strong.merge_weaker(&weak);

        assert_eq!(strong.type_name.as_deref(), Some("Xform"));
        assert_eq!(strong.attributes["size"], Value::from(1.0));
        assert_eq!(strong.attributes["color"], Value::from("red"));
        assert_eq!(strong.references, vec!["geo.json"]);
    }

    #[test]
    fn test_reroot() {
        assert_eq!(reroot("/Model", "/Model", "/World/Chair").as_deref(), Some("/World/Chair"));
        assert_eq!(
            reroot("/Model/Geom", "/Model", "/World/Chair").as_deref(),
            Some("/World/Chair/Geom")
        );
        assert_eq!(reroot("/ModelB", "/Model", "/World"), None);
        assert_eq!(reroot("/Other", "/Model", "/World"), None);
    }

    #[test]
    fn test_is_root_path() {
        assert!(is_root_path("/World"));
        assert!(!is_root_path("/World/Chair"));
        assert!(!is_root_path("/"));
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let mut doc = LayerDocument::default();
        doc.prims.insert("/A".to_string(), PrimSpec::new("Xform"));
        let text = String::from_utf8(doc.to_vec().unwrap()).unwrap();
        assert!(text.contains("\"type\": \"Xform\""));
        assert!(!text.contains("references"));
        assert!(!text.contains("subLayers"));
    }
}
