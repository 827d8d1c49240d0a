//! Asset resolution for layer composition.
//!
//! An asset path is the opaque token a layer declares for a dependency
//! (`@./geo.usda@`, `props/chair.json`, ...). Resolvers turn that token into
//! a canonical URI plus bytes and keep everything they fetched in an
//! `AssetCache`, so later lookups by URI never hit the transport again.
//!
//! The `AssetMap` is the per-run record of what was fetched; the composer
//! stages its entries into the layer before each operator that needs them.

mod cache;
mod file;
mod map;
mod memory;
mod resolver;

pub use cache::*;
pub use file::*;
pub use map::*;
pub use memory::*;
pub use resolver::*;
