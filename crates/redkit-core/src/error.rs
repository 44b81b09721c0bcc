//! Error types for redkit-core

use crate::TypeName;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Class already registered: {0}")]
    DuplicateClass(TypeName),

    #[error("Duplicate external name '{red_name}' in class {class}")]
    DuplicateExternalName { class: TypeName, red_name: String },

    #[error("Unknown type: {0}")]
    UnknownType(TypeName),

    #[error("Capacity exceeded: array holds at most {max_size} elements")]
    CapacityExceeded { max_size: usize },

    #[error("A global type registry is already installed")]
    GlobalRegistryInstalled,

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
