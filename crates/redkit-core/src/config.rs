//! Registry configuration - recursion limits and validation strictness
//!
//! Class metadata comes from an external schema, so the registry guards
//! against malformed input: cyclic inheritance chains and self-embedding
//! classes are cut off at configurable depths instead of recursing forever.

use serde::{Deserialize, Serialize};

/// Default limit for nested object initialization
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Default limit for inheritance chain walks
pub const DEFAULT_MAX_INHERITANCE_DEPTH: usize = 32;

/// Configuration for a [`TypeRegistry`](crate::TypeRegistry)
///
/// # Example
///
/// ```
/// use redkit_core::RegistryConfig;
///
/// let config = RegistryConfig::default();
/// assert_eq!(config.max_nesting_depth(), 64);
/// assert!(!config.strict_names());
///
/// let config = RegistryConfig::default()
///     .with_max_nesting_depth(8)
///     .with_strict_names(true);
/// assert_eq!(config.max_nesting_depth(), 8);
/// assert!(config.strict_names());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How deep `init_class` descends into nested objects
    ///
    /// Properties below this depth are stored as `Null`. Clamped to `>= 1`.
    max_nesting_depth: usize,
    /// How many parent links are followed when computing effective metadata
    ///
    /// Clamped to `>= 1`.
    max_inheritance_depth: usize,
    /// Reject class declarations that repeat an external name
    strict_names: bool,
}

impl RegistryConfig {
    /// Set the nested initialization depth limit
    ///
    /// The value is clamped to `>= 1`.
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth.max(1);
        self
    }

    /// Set the inheritance walk depth limit
    ///
    /// The value is clamped to `>= 1`.
    pub fn with_max_inheritance_depth(mut self, depth: usize) -> Self {
        self.max_inheritance_depth = depth.max(1);
        self
    }

    /// Enable or disable strict external name validation
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Nested initialization depth limit
    pub fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth.max(1)
    }

    /// Inheritance walk depth limit
    pub fn max_inheritance_depth(&self) -> usize {
        self.max_inheritance_depth.max(1)
    }

    /// Whether duplicate external names are rejected at registration
    pub fn strict_names(&self) -> bool {
        self.strict_names
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_inheritance_depth: DEFAULT_MAX_INHERITANCE_DEPTH,
            strict_names: false,
        }
    }
}
