//! Redkit Schema - RON loader for class metadata
//!
//! Reads class declarations (properties, inheritance, constructor
//! defaults) from RON files and builds a [`redkit_core::TypeRegistry`].

mod error;
mod loader;
mod schema;

pub use error::{Error, Result};
pub use loader::Loader;
pub use schema::SchemaFile;
