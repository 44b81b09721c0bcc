//! Class metadata: property descriptors, class declarations and the
//! effective (own + inherited) view computed by the registry

use crate::value::{HandleKind, Literal, ResourceKind};
use crate::TypeName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Auxiliary integers attached to a property (e.g. fixed buffer capacity)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(pub Vec<u32>);

impl Flags {
    /// No flags
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Check if there are no flags
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first flag, used as a size or capacity argument
    pub fn first(&self) -> Option<u32> {
        self.0.first().copied()
    }

    /// Iterate over flags in declaration order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<u32>> for Flags {
    fn from(flags: Vec<u32>) -> Self {
        Self(flags)
    }
}

/// Descriptor of a single declared property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    /// Code-facing member name
    pub name: String,
    /// Serialized name; properties without one are not stored by `init_class`
    #[serde(default)]
    pub red_name: Option<String>,
    /// Position in the binary layout, preserved for readers and writers
    #[serde(default)]
    pub ordinal: u32,
    /// Declared engine type
    pub declared_type: TypeName,
    #[serde(default)]
    pub flags: Flags,
    /// Present in metadata but skipped by serializers
    #[serde(default)]
    pub is_ignored: bool,
}

impl PropertyInfo {
    /// Create a property with an explicit external name
    pub fn new(
        name: impl Into<String>,
        red_name: impl Into<String>,
        declared_type: impl Into<TypeName>,
    ) -> Self {
        Self {
            name: name.into(),
            red_name: Some(red_name.into()),
            ordinal: 0,
            declared_type: declared_type.into(),
            flags: Flags::empty(),
            is_ignored: false,
        }
    }

    /// Create a property that has no external name
    pub fn unnamed(name: impl Into<String>, declared_type: impl Into<TypeName>) -> Self {
        Self {
            red_name: None,
            ..Self::new(name, "", declared_type)
        }
    }

    /// Set the ordinal
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Set the flags
    pub fn with_flags(mut self, flags: impl Into<Flags>) -> Self {
        self.flags = flags.into();
        self
    }

    /// Mark the property as ignored by serializers
    pub fn ignored(mut self) -> Self {
        self.is_ignored = true;
        self
    }

    /// The explicit external name, if declared and non-empty
    pub fn red_name(&self) -> Option<&str> {
        self.red_name.as_deref().filter(|n| !n.is_empty())
    }

    /// The external name used for get/set: explicit name or the member name
    pub fn resolved_name(&self) -> &str {
        self.red_name().unwrap_or(&self.name)
    }
}

/// Declaration of a class as supplied by the schema source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: TypeName,
    #[serde(default)]
    pub parent: Option<TypeName>,
    /// Own properties only; inherited ones come from `parent`
    #[serde(default)]
    pub properties: Vec<PropertyInfo>,
    /// Constructor overrides applied after default initialization
    ///
    /// Paths are external names; dots descend into nested objects
    /// (e.g. `localTransform.orientation.r`).
    #[serde(default)]
    pub defaults: Vec<(String, Literal)>,
}

impl ClassDecl {
    /// Create an empty class declaration
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            properties: Vec::new(),
            defaults: Vec::new(),
        }
    }

    /// Set the parent class
    pub fn extends(mut self, parent: impl Into<TypeName>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Add a property declaration
    pub fn with_property(mut self, property: PropertyInfo) -> Self {
        self.properties.push(property);
        self
    }

    /// Add a constructor default
    pub fn with_default(mut self, path: impl Into<String>, value: Literal) -> Self {
        self.defaults.push((path.into(), value));
        self
    }
}

/// Effective metadata of a type: own and inherited properties
#[derive(Debug, Clone)]
pub struct TypeInfo {
    name: TypeName,
    is_class: bool,
    chain: Vec<TypeName>,
    properties: Vec<PropertyInfo>,
    by_member: HashMap<String, usize>,
    by_red_name: HashMap<String, usize>,
    defaults: Vec<(String, Literal)>,
}

impl TypeInfo {
    /// Metadata for a type with no class declaration
    pub fn unknown(name: TypeName) -> Self {
        Self {
            name,
            is_class: false,
            chain: Vec::new(),
            properties: Vec::new(),
            by_member: HashMap::new(),
            by_red_name: HashMap::new(),
            defaults: Vec::new(),
        }
    }

    pub(crate) fn class(
        name: TypeName,
        chain: Vec<TypeName>,
        properties: Vec<PropertyInfo>,
        defaults: Vec<(String, Literal)>,
    ) -> Self {
        let mut by_member = HashMap::new();
        let mut by_red_name = HashMap::new();
        for (index, property) in properties.iter().enumerate() {
            by_member.entry(property.name.clone()).or_insert(index);
            if let Some(red_name) = property.red_name() {
                by_red_name.entry(red_name.to_string()).or_insert(index);
            }
        }
        Self {
            name,
            is_class: true,
            chain,
            properties,
            by_member,
            by_red_name,
            defaults,
        }
    }

    /// The type this metadata describes
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// Whether the type has a class declaration
    pub fn is_class(&self) -> bool {
        self.is_class
    }

    /// The type followed by its ancestors, most-derived first
    pub fn chain(&self) -> &[TypeName] {
        &self.chain
    }

    /// Effective properties, most-derived class first
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    /// Look up a property by its code-facing member name
    pub fn property_by_name(&self, member: &str) -> Option<&PropertyInfo> {
        self.by_member.get(member).map(|&i| &self.properties[i])
    }

    /// Look up a property by its external name
    pub fn property_by_red_name(&self, red_name: &str) -> Option<&PropertyInfo> {
        self.by_red_name.get(red_name).map(|&i| &self.properties[i])
    }

    /// Properties a reader or writer handles, in binary layout order
    ///
    /// Ignored properties are left out. Properties without an external
    /// name have no stored value and are left out too.
    pub fn serialized_properties(&self) -> Vec<&PropertyInfo> {
        let mut properties: Vec<_> = self
            .properties
            .iter()
            .filter(|p| !p.is_ignored && p.red_name().is_some())
            .collect();
        properties.sort_by_key(|p| p.ordinal);
        properties
    }

    /// Constructor defaults, base class first
    pub fn defaults(&self) -> &[(String, Literal)] {
        &self.defaults
    }

    /// Number of effective properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if the type has no properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// How a property's default value is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Zero value from the scalar factory table
    Scalar,
    /// Array pre-filled with `capacity` element defaults
    FixedArray { capacity: usize },
    /// Empty array whose maximum size is configured after construction
    BoundedArray { max_size: usize },
    /// Empty growable array
    DynamicArray,
    /// Recursively initialized nested object
    NestedObject,
    /// Non-owning cross-reference, starts unset
    Reference(HandleKind),
    /// Depot resource path, starts empty
    Resource(ResourceKind),
    /// Not a known engine type
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_name_fallback() {
        let named = PropertyInfo::new("LocalTransform", "localTransform", "WorldTransform");
        assert_eq!(named.red_name(), Some("localTransform"));
        assert_eq!(named.resolved_name(), "localTransform");

        let unnamed = PropertyInfo::unnamed("AllowedTags", "CArray<CName>");
        assert_eq!(unnamed.red_name(), None);
        assert_eq!(unnamed.resolved_name(), "AllowedTags");

        let empty = PropertyInfo::new("Hidden", "", "CBool");
        assert_eq!(empty.red_name(), None);
    }

    #[test]
    fn test_class_decl_builder() {
        let decl = ClassDecl::new("DismembermentInstigated")
            .extends("redEvent")
            .with_property(PropertyInfo::new("BodyPart", "bodyPart", "CUInt32").with_ordinal(0))
            .with_default("bodyPart", Literal::Int(2));

        assert_eq!(decl.parent, Some(TypeName::new("redEvent")));
        assert_eq!(decl.properties.len(), 1);
        assert_eq!(decl.defaults.len(), 1);
    }

    #[test]
    fn test_flags() {
        let flags = Flags::from(vec![3, 7]);
        assert_eq!(flags.first(), Some(3));
        assert_eq!(flags.iter().collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(Flags::empty().first(), None);
    }

    #[test]
    fn test_type_info_lookup_prefers_first() {
        let info = TypeInfo::class(
            TypeName::new("Derived"),
            vec![TypeName::new("Derived"), TypeName::new("Base")],
            vec![
                PropertyInfo::new("Name", "name", "CName"),
                PropertyInfo::new("Name", "baseName", "CName"),
            ],
            Vec::new(),
        );
        assert!(info.is_class());
        assert_eq!(info.property_by_name("Name").unwrap().resolved_name(), "name");
        assert_eq!(
            info.property_by_red_name("baseName").unwrap().declared_type,
            TypeName::new("CName")
        );
        assert!(!TypeInfo::unknown(TypeName::new("Nope")).is_class());
    }

    #[test]
    fn test_serialized_properties_skip_ignored() {
        let info = TypeInfo::class(
            TypeName::new("gameEffectExecutor"),
            vec![TypeName::new("gameEffectExecutor")],
            vec![
                PropertyInfo::new("Effect", "effect", "CResourceAsyncReference<worldEffect>")
                    .with_ordinal(2),
                PropertyInfo::new("Cache", "cache", "CBool").with_ordinal(1).ignored(),
                PropertyInfo::new("Tag", "tag", "CName").with_ordinal(0),
                PropertyInfo::unnamed("Scratch", "CInt32").with_ordinal(3),
            ],
            Vec::new(),
        );
        let names: Vec<_> = info
            .serialized_properties()
            .iter()
            .map(|p| p.resolved_name())
            .collect();
        assert_eq!(names, vec!["tag", "effect"]);
        assert_eq!(info.len(), 4);
    }
}
