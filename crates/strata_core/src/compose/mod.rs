//! Progressive layer composition.
//!
//! Composition follows the LIVRPS strength ordering:
//! - **L**ocal (sublayers are merged first, once)
//! - **I**nherits
//! - **V**ariantSets
//! - **R**eferences
//! - **P**ayloads
//! - **S**pecializes (not supported)
//!
//! Sublayers are resolved eagerly and composed at the layer level before
//! any other arc. Inherits, variants, references and payloads are then
//! applied in a bounded fixpoint loop, because composing one kind can
//! introduce new arcs of any kind (a referenced prim may carry its own
//! references, a selected variant may add a payload).
//!
//! Both the sublayer depth and the loop length are bounded by
//! [`CompositionConfig`]. What happens when a bound is hit is decided by
//! [`BoundPolicy`]; it is never silent.

mod config;
mod engine;
mod error;
mod state;
mod sublayers;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use state::*;
