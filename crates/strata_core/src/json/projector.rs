//! Projection of composed JSON layers into a `Scene`.

use super::layer::JsonLayer;
use crate::scene::{ProjectionError, Scene, ScenePrim, SceneProjector};

/// Flattens a composed [`JsonLayer`] into a [`Scene`].
///
/// Class prims (`/_class_*` by convention) only exist to be inherited from
/// and are left out unless `include_classes` is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSceneProjector {
    pub include_classes: bool,
}

impl JsonSceneProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classes(mut self) -> Self {
        self.include_classes = true;
        self
    }
}

impl SceneProjector<JsonLayer> for JsonSceneProjector {
    type Output = Scene;

    fn project(&self, layer: &JsonLayer) -> Result<Scene, ProjectionError> {
        if layer.prim_count() == 0 {
            return Err(ProjectionError::EmptyLayer);
        }

        let mut scene = Scene::new(scene_name(layer.uri()));
        for (path, prim) in &layer.document().prims {
            if !self.include_classes && is_class_path(path) {
                continue;
            }
            if prim.has_arcs() {
                log::warn!("Projecting '{}' with unresolved composition arcs", path);
            }
            scene.add_prim(ScenePrim {
                path: path.clone(),
                type_name: prim.type_name.clone(),
                attributes: prim.attributes.clone(),
            });
        }

        log::info!(
            "Projected scene '{}': {} prims, {} attributes",
            scene.name,
            scene.prim_count(),
            scene.attribute_count()
        );
        Ok(scene)
    }
}

fn is_class_path(path: &str) -> bool {
    path.split('/').any(|part| part.starts_with("_class"))
}

/// File stem of the last URI component.
fn scene_name(uri: &str) -> String {
    let file = uri.rsplit('/').next().unwrap_or(uri);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}
