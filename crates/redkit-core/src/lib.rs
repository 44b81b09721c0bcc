//! Redkit Core - schema-driven reflective object model
//!
//! This crate represents instances of an externally defined engine type
//! system without a compiled type per class:
//! - Tagged property values (`RedValue`, `ArrayRef`, `RedHandle`)
//! - Class metadata and a compute-once registry (`TypeRegistry`)
//! - Default value synthesis from metadata (`DefaultSynthesizer`)
//! - Reflected objects with get/set, deep and shallow copy, structural
//!   equality and flattening (`RedClass`)
//! - Per-worker change notification (`ChangeRouter`)
//!
//! ## Lifecycle
//!
//! ```
//! use redkit_core::{ClassDecl, PropertyInfo, RedClass, RedValue, TypeRegistry};
//!
//! let mut registry = TypeRegistry::default();
//! registry
//!     .register(ClassDecl::new("netIEntityState")
//!         .with_property(PropertyInfo::new("RecordID", "recordID", "TweakDBID"))
//!         .with_property(PropertyInfo::new("PersistentID", "persistentID", "CUInt64")))
//!     .unwrap();
//!
//! let mut state = RedClass::new("netIEntityState");
//! state.init_class(&registry);
//! assert_eq!(state.get("persistentID"), &RedValue::UInt64(0));
//!
//! let copy = state.deep_copy();
//! assert!(copy.equals(&state));
//! ```
//!
//! Byte layout, compression and reference resolution belong to the
//! container reader/writer that drives these objects.

mod class;
mod config;
mod defaults;
mod error;
mod identity;
pub mod metadata;
mod registry;
mod router;
mod value;

pub use class::{ClassRef, DictValue, PropertyDict, RedClass};
pub use config::{RegistryConfig, DEFAULT_MAX_INHERITANCE_DEPTH, DEFAULT_MAX_NESTING_DEPTH};
pub use defaults::DefaultSynthesizer;
pub use error::{Error, Result};
pub use identity::TypeName;
pub use metadata::{ClassDecl, Flags, PropertyInfo, TypeInfo, ValueKind};
pub use registry::{DefaultFactory, TypeRegistry};
pub use router::{change_handler, ChangeHandler, ChangeRouter, ObjectChanged};
pub use value::{
    ArrayKind, ArrayRef, HandleKind, Literal, RedArray, RedHandle, RedValue, ResourceKind,
    ResourceRef,
};
