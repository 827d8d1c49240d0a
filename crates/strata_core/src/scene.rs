//! Scene projection types.
//!
//! A projector flattens a composed layer into something a renderer can
//! consume. `Scene` is the renderer-agnostic form this crate ships; real
//! renderer adapters implement `SceneProjector` with their own output type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during scene projection.
#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("Layer has no prims to project")]
    EmptyLayer,
}

/// Converts a composed layer into renderer-facing objects.
///
/// Only called after composition has terminated.
pub trait SceneProjector<L> {
    type Output;

    fn project(&self, layer: &L) -> Result<Self::Output, ProjectionError>;
}

/// A single prim in the projected scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenePrim {
    /// Prim path (e.g., "/World/Chair")
    pub path: String,

    /// Type name (e.g., "Xform", "Mesh"), if authored
    pub type_name: Option<String>,

    /// Resolved attribute values
    pub attributes: BTreeMap<String, Value>,
}

impl ScenePrim {
    /// Last component of the prim path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Number of path components (root prims are depth 1).
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|part| !part.is_empty()).count()
    }
}

/// A composed, flattened scene.
///
/// Prims are kept in path order, so parents always precede their children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene name (usually from the root layer's file name)
    pub name: String,

    /// Flattened prims, in path order
    pub prims: Vec<ScenePrim>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prims: Vec::new(),
        }
    }

    pub fn add_prim(&mut self, prim: ScenePrim) {
        self.prims.push(prim);
    }

    /// Find a prim by path.
    pub fn find(&self, path: &str) -> Option<&ScenePrim> {
        self.prims.iter().find(|prim| prim.path == path)
    }

    pub fn prim_count(&self) -> usize {
        self.prims.len()
    }

    /// Total number of attributes across all prims.
    pub fn attribute_count(&self) -> usize {
        self.prims.iter().map(|prim| prim.attributes.len()).sum()
    }

    /// Prims with no parent prim.
    pub fn root_prims(&self) -> impl Iterator<Item = &ScenePrim> {
        self.prims.iter().filter(|prim| prim.depth() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prim(path: &str, attributes: &[(&str, Value)]) -> ScenePrim {
        ScenePrim {
            path: path.to_string(),
            type_name: Some("Xform".to_string()),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_scene_counters() {
        let mut scene = Scene::new("shot");
        scene.add_prim(prim("/World", &[]));
        scene.add_prim(prim("/World/Chair", &[("height", Value::from(1.2))]));

        assert_eq!(scene.prim_count(), 2);
        assert_eq!(scene.attribute_count(), 1);
        assert_eq!(scene.root_prims().count(), 1);
        assert_eq!(scene.find("/World/Chair").unwrap().name(), "Chair");
        assert_eq!(scene.find("/World/Chair").unwrap().depth(), 2);
        assert!(scene.find("/Missing").is_none());
    }
}
