//! Identity types for engine classes and property types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an engine type (class, scalar, or generic container)
///
/// Generic instantiations are written with angle brackets, e.g.
/// `CArray<CName>` or `CHandle<entEntity>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(pub String);

impl TypeName {
    /// Create a new type name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this names a generic instantiation
    pub fn is_generic(&self) -> bool {
        self.0.contains('<')
    }

    /// The unbound generic form (`CArray<CName>` -> `CArray`)
    ///
    /// Non-generic names are returned unchanged.
    pub fn generic_definition(&self) -> &str {
        match self.0.find('<') {
            Some(pos) => self.0[..pos].trim_end(),
            None => &self.0,
        }
    }

    /// The bound type argument (`CArray<CName>` -> `CName`)
    pub fn type_argument(&self) -> Option<TypeName> {
        let open = self.0.find('<')?;
        let close = self.0.rfind('>')?;
        if close <= open + 1 {
            return None;
        }
        Some(TypeName::new(self.0[open + 1..close].trim()))
    }

    /// Normalize to the unbound generic form used as a handler key
    pub fn normalized(&self) -> TypeName {
        if self.is_generic() {
            TypeName::new(self.generic_definition())
        } else {
            self.clone()
        }
    }

    /// Build a generic instantiation, e.g. `generic("CArray", "CName")`
    pub fn generic(definition: &str, argument: &TypeName) -> Self {
        Self(format!("{}<{}>", definition, argument))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for TypeName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TypeName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
