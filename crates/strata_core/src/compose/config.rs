//! Composition bounds and policy.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bound on sublayer nesting depth.
pub const DEFAULT_MAX_SUBLAYER_DEPTH: usize = 16;

/// Default bound on fixpoint-loop iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 16;

/// Errors that can occur while loading a composition config.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// What the composer does when a depth or iteration bound is hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundPolicy {
    /// Fail the run with a typed error.
    #[default]
    Strict,

    /// Return the partially composed layer and list the hit bounds in the report.
    Lenient,
}

/// Tunable limits for one composition run.
///
/// ```json
/// { "maxSublayerDepth": 16, "maxIterations": 16, "boundPolicy": "strict" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CompositionConfig {
    /// Deepest sublayer nesting that is still fetched (root sublayers are depth 1)
    pub max_sublayer_depth: usize,

    /// Maximum passes of the inherits/variants/references/payloads loop
    pub max_iterations: usize,

    /// Behavior when either bound is hit
    pub bound_policy: BoundPolicy,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            max_sublayer_depth: DEFAULT_MAX_SUBLAYER_DEPTH,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            bound_policy: BoundPolicy::Strict,
        }
    }
}

impl CompositionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sublayer_depth(mut self, depth: usize) -> Self {
        self.max_sublayer_depth = depth;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_bound_policy(mut self, policy: BoundPolicy) -> Self {
        self.bound_policy = policy;
        self
    }

    /// Shorthand for [`BoundPolicy::Lenient`].
    pub fn lenient(self) -> Self {
        self.with_bound_policy(BoundPolicy::Lenient)
    }

    pub fn is_strict(&self) -> bool {
        self.bound_policy == BoundPolicy::Strict
    }

    /// Check that both bounds allow at least one step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sublayer_depth == 0 {
            return Err(ConfigError::Invalid(
                "maxSublayerDepth must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "maxIterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompositionConfig::default();
        assert_eq!(config.max_sublayer_depth, 16);
        assert_eq!(config.max_iterations, 16);
        assert!(config.is_strict());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = CompositionConfig::from_json_str(r#"{ "maxIterations": 4 }"#).unwrap();
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.max_sublayer_depth, DEFAULT_MAX_SUBLAYER_DEPTH);

        let lenient = CompositionConfig::from_json_str(r#"{ "boundPolicy": "lenient" }"#).unwrap();
        assert_eq!(lenient.bound_policy, BoundPolicy::Lenient);
    }

    #[test]
    fn test_rejects_zero_bounds_and_unknown_fields() {
        let zero = CompositionConfig::from_json_str(r#"{ "maxSublayerDepth": 0 }"#);
        assert!(matches!(zero, Err(ConfigError::Invalid(_))));

        let typo = CompositionConfig::from_json_str(r#"{ "maxIteration": 3 }"#);
        assert!(matches!(typo, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_builder() {
        let config = CompositionConfig::new()
            .with_max_sublayer_depth(2)
            .with_max_iterations(3)
            .lenient();
        assert_eq!(config.max_sublayer_depth, 2);
        assert_eq!(config.max_iterations, 3);
        assert!(!config.is_strict());
    }
}
