//! Strata Core - progressive USD-style layer composition.
//!
//! This crate provides:
//!
//! - **Asset resolution**: `AssetResolver` plus in-memory and on-disk resolvers
//! - **Layer capabilities**: the `Layer` / `LayerEngine` traits a layer backend implements
//! - **Composition**: `Composer`, which drives a root layer through sublayers and
//!   the bounded LIVRPS fixpoint loop (inherits, variants, references, payloads)
//! - **Reference backend**: a JSON layer document format with real merge semantics
//! - **Scene projection**: flattening a composed layer into a renderer-facing `Scene`
//!
//! # Example
//!
//! ```ignore
//! use strata_core::asset::FileResolver;
//! use strata_core::compose::Composer;
//! use strata_core::json::JsonLayerEngine;
//!
//! let mut composer = Composer::new(FileResolver::new("assets/demo"), JsonLayerEngine::new());
//! let composition = pollster::block_on(composer.compose("shot.json"))?;
//! println!("Composed in {} iterations", composition.report.iterations);
//! ```

pub mod asset;
pub mod compose;
pub mod json;
pub mod layer;
pub mod scene;

// Re-export commonly used types
pub use asset::{AssetBytes, AssetMap, AssetResolver, FetchError, FileResolver, MemoryResolver};
pub use compose::{
    BoundPolicy, Composer, Composition, CompositionConfig, CompositionError, CompositionReport,
    CompositionResult,
};
pub use layer::{CompositionKind, Layer, LayerEngine, LayerError};
pub use scene::{Scene, ScenePrim, SceneProjector};
