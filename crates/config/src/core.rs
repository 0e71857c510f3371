//! Core configuration sections

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General evaluation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Configuration name used when generator expressions are resolved
    /// eagerly (`$<CONFIG:...>` membership).
    #[serde(default = "default_config_name")]
    pub config_name: String,

    /// Emit events as JSON lines to stdout instead of the summary view.
    #[serde(default)]
    pub json_events: bool,
}

fn default_config_name() -> String {
    "Debug".to_string()
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            config_name: default_config_name(),
            json_events: false,
        }
    }
}

/// Depth and recursion limits for the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum nesting for generator-expression evaluation.
    #[serde(default = "default_genex_depth")]
    pub max_genex_depth: usize,

    /// Maximum `TARGET_PROPERTY` chain length before the cycle guard trips.
    #[serde(default = "default_target_property_depth")]
    pub max_target_property_depth: usize,

    /// Maximum `include`/`add_subdirectory`/`find_package` nesting.
    #[serde(default = "default_include_depth")]
    pub max_include_depth: usize,
}

fn default_genex_depth() -> usize {
    64
}

fn default_target_property_depth() -> usize {
    64
}

fn default_include_depth() -> usize {
    64
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_genex_depth: default_genex_depth(),
            max_target_property_depth: default_target_property_depth(),
            max_include_depth: default_include_depth(),
        }
    }
}

/// Filesystem boundary policy for `file(...)` operations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    /// Directories allowed in addition to the source and binary trees.
    #[serde(default)]
    pub extra_allowed_roots: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.max_genex_depth, 64);
        assert_eq!(limits.max_target_property_depth, 64);
        assert_eq!(limits.max_include_depth, 64);
        assert_eq!(EvalConfig::default().config_name, "Debug");
        assert!(SecurityConfig::default().extra_allowed_roots.is_empty());
    }
}
