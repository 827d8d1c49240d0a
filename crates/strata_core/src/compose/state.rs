//! Per-run counters and the report handed back to the caller.

use std::fmt;

use crate::layer::CompositionKind;

/// A composition bound that was hit with work still outstanding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoundExceeded {
    /// A sublayer nested deeper than the depth bound was not fetched.
    SublayerDepth { max_depth: usize, asset_path: String },

    /// The fixpoint loop ran out of iterations with arcs still pending.
    Iterations {
        max_iterations: usize,
        pending: Vec<CompositionKind>,
    },
}

impl fmt::Display for BoundExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundExceeded::SublayerDepth {
                max_depth,
                asset_path,
            } => write!(
                f,
                "sublayer '{}' skipped beyond depth {}",
                asset_path, max_depth
            ),
            BoundExceeded::Iterations {
                max_iterations,
                pending,
            } => {
                write!(f, "{} iterations exhausted with pending", max_iterations)?;
                for (i, kind) in pending.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{}{}", sep, kind)?;
                }
                Ok(())
            }
        }
    }
}

/// Counters bounding one composition run.
#[derive(Clone, Debug, Default)]
pub struct CompositionState {
    /// Sublayer depth currently being resolved (root sublayers are depth 1)
    pub depth: usize,

    /// Current fixpoint-loop iteration (1-based, 0 before Phase B)
    pub iteration: usize,

    /// Bounds hit so far
    pub bounds_exceeded: Vec<BoundExceeded>,
}

impl CompositionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// First sublayer that was skipped for depth, if any.
    pub fn depth_exceeded(&self) -> Option<(usize, &str)> {
        self.bounds_exceeded.iter().find_map(|bound| match bound {
            BoundExceeded::SublayerDepth {
                max_depth,
                asset_path,
            } => Some((*max_depth, asset_path.as_str())),
            BoundExceeded::Iterations { .. } => None,
        })
    }
}

/// Summary of a finished composition run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositionReport {
    /// Fixpoint-loop passes consumed, including the pass that found nothing pending
    pub iterations: usize,

    /// Passes that invoked at least one composition operator
    pub composing_iterations: usize,

    /// Distinct sublayers fetched and loaded
    pub sublayers_visited: usize,

    /// Composition operators invoked, in order
    pub operators: Vec<CompositionKind>,

    /// Bounds that were hit (only non-empty under a lenient policy)
    pub bounds_exceeded: Vec<BoundExceeded>,
}

impl CompositionReport {
    /// Whether composition finished without hitting any bound.
    pub fn converged(&self) -> bool {
        self.bounds_exceeded.is_empty()
    }

    /// How many times the operator for `kind` ran.
    pub fn operator_count(&self, kind: CompositionKind) -> usize {
        self.operators.iter().filter(|k| **k == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_display() {
        let depth = BoundExceeded::SublayerDepth {
            max_depth: 16,
            asset_path: "deep.json".to_string(),
        };
        assert_eq!(depth.to_string(), "sublayer 'deep.json' skipped beyond depth 16");

        let iterations = BoundExceeded::Iterations {
            max_iterations: 4,
            pending: vec![CompositionKind::References, CompositionKind::Payloads],
        };
        assert_eq!(
            iterations.to_string(),
            "4 iterations exhausted with pending references, payloads"
        );
    }

    #[test]
    fn test_depth_exceeded_lookup() {
        let mut state = CompositionState::new();
        assert!(state.depth_exceeded().is_none());

        state.bounds_exceeded.push(BoundExceeded::SublayerDepth {
            max_depth: 2,
            asset_path: "c.json".to_string(),
        });
        assert_eq!(state.depth_exceeded(), Some((2, "c.json")));
    }
}
