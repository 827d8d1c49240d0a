//! Reference layer engine over JSON layer documents.
//!
//! This is not a USD grammar parser. It is a compact document format with
//! the same composition arcs, used to exercise the composer end to end
//! (tests, the `strata` CLI) with real merge semantics.
//!
//! ```json
//! {
//!   "defaultPrim": "Chair",
//!   "subLayers": ["base.json"],
//!   "prims": {
//!     "/Chair": {
//!       "type": "Xform",
//!       "attributes": { "height": 1.0 },
//!       "references": ["geo/chair_geo.json"],
//!       "inherits": ["/_class_Furniture"],
//!       "variantSets": {
//!         "finish": { "selection": "oak", "variants": { "oak": { "attributes": { "color": "brown" } } } }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Opinions follow strength order: an opinion already on a prim is never
//! overwritten by a sublayer, class, variant, reference or payload.

mod document;
mod engine;
mod layer;
mod projector;

pub use document::*;
pub use engine::*;
pub use layer::*;
pub use projector::*;
