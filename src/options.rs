//! Solver configuration, loaded from code or from a TOML file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SolverError;

/// Tunable knobs for a solver run. Every field defaults to a sane value so a caller can
/// construct `SolverOptions::default()` and only override what matters to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Floating-point slack tolerated by invariant checks.
    pub epsilon: f64,
    /// Maximum number of driver iterations before `run` stops on its own.
    pub max_iterations: u64,
    /// Optional wall-clock budget, in seconds. `None` means no time-based termination.
    pub time_limit_secs: Option<u64>,
    /// Number of iterations between progress log lines.
    pub log_interval: u64,
    /// Documents that the core's message order is deterministic; does not change behavior.
    /// Callers that assert determinism in tests can check this flag is still `true`.
    pub deterministic_order: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            epsilon: crate::EPSILON,
            max_iterations: 1000,
            time_limit_secs: None,
            log_interval: 1,
            deterministic_order: true,
        }
    }
}

impl SolverOptions {
    /// Parses options from a TOML document. Missing fields fall back to their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, SolverError> {
        toml::from_str(text)
            .map_err(|err| SolverError::usage(format!("invalid solver options: {err}")))
    }

    /// Reads and parses options from a TOML file on disk.
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, SolverError> {
        let text = fs::read_to_string(path.as_ref()).map_err(|err| {
            SolverError::usage(format!(
                "could not read solver options from {}: {err}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let opts = SolverOptions::default();
        assert_eq!(opts.epsilon, 1e-8);
        assert_eq!(opts.max_iterations, 1000);
        assert_eq!(opts.time_limit_secs, None);
        assert_eq!(opts.log_interval, 1);
        assert!(opts.deterministic_order);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let opts = SolverOptions::from_toml_str("max_iterations = 50\n").unwrap();
        assert_eq!(opts.max_iterations, 50);
        assert_eq!(opts.epsilon, 1e-8);
    }

    #[test]
    fn invalid_toml_is_a_usage_error() {
        let err = SolverOptions::from_toml_str("max_iterations = \"fifty\"").unwrap_err();
        assert!(matches!(err, SolverError::UsageError { .. }));
    }

    #[test]
    fn missing_file_is_a_usage_error() {
        let err = SolverOptions::from_toml_path("/nonexistent/options.toml").unwrap_err();
        assert!(matches!(err, SolverError::UsageError { .. }));
    }
}
