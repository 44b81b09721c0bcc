//! Reflected engine objects: a typed bag of named properties
//!
//! A [`RedClass`] stores its properties by external (serialized) name.
//! Which properties exist, and what their defaults look like, comes from
//! the [`TypeRegistry`] rather than from the object itself.
//!
//! # Ownership
//!
//! Nested objects are held through [`ClassRef`], a shared lock-protected
//! pointer. Arrays are held the same way through [`ArrayRef`](crate::ArrayRef). A
//! shallow copy shares nested objects and arrays with its source; a deep
//! copy duplicates the whole containment tree. Handles never own their
//! referent and are copied by reference in both cases.
//!
//! # Concurrency
//!
//! A single object is a single-writer structure. Different objects may be
//! used from different threads independently.

use crate::defaults::DefaultSynthesizer;
use crate::error::{Error, Result};
use crate::metadata::ValueKind;
use crate::registry::TypeRegistry;
use crate::router::ChangeRouter;
use crate::value::{Literal, RedValue};
use crate::TypeName;
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::{Arc, Weak};
use tracing::warn;
use uuid::Uuid;

/// Flattened view of an object: external name to value or nested mapping
pub type PropertyDict = IndexMap<String, DictValue>;

/// An entry of a [`PropertyDict`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DictValue {
    Value(RedValue),
    Nested(PropertyDict),
}

/// A reflected engine object
///
/// `Clone` is the shallow copy: nested objects and arrays are shared with
/// the source.
#[derive(Debug, Clone)]
pub struct RedClass {
    class_type: TypeName,
    /// Position recorded by an external container, unset by default
    pub chunk: Option<usize>,
    /// Instance identifier used by containers for cross-object references
    pub guid: Uuid,
    properties: IndexMap<String, RedValue>,
}

impl RedClass {
    /// Create a bare, uninitialized object
    pub fn new(class_type: impl Into<TypeName>) -> Self {
        Self {
            class_type: class_type.into(),
            chunk: None,
            guid: Uuid::new_v4(),
            properties: IndexMap::new(),
        }
    }

    /// Create a fully initialized object with its constructor defaults
    pub fn construct(registry: &TypeRegistry, class_type: impl Into<TypeName>) -> Result<Self> {
        let class_type = class_type.into();
        if !registry.contains_class(&class_type) {
            return Err(Error::UnknownType(class_type));
        }
        let mut class = Self::new(class_type);
        class.init_class(registry);
        class.apply_defaults(registry);
        Ok(class)
    }

    /// The declared type of this object
    pub fn class_type(&self) -> &TypeName {
        &self.class_type
    }

    /// Fill every declared property that is not yet present
    ///
    /// Nested objects already present are initialized too. Calling this
    /// again does nothing for properties that already exist.
    ///
    /// Returns the number of present nested objects that were skipped
    /// because another holder had them locked. Those objects may still
    /// miss properties; calling again once the locks are released
    /// completes them.
    pub fn init_class(&mut self, registry: &TypeRegistry) -> usize {
        self.init_class_at(registry, 0)
    }

    pub(crate) fn init_class_at(&mut self, registry: &TypeRegistry, depth: usize) -> usize {
        let info = registry.type_info(&self.class_type);
        let synth = DefaultSynthesizer::new(registry);
        let mut skipped = 0;

        for property in info.properties() {
            let Some(red_name) = property.red_name() else {
                continue;
            };

            if !self.properties.contains_key(red_name) {
                let value = synth.synthesize(property, depth);
                self.properties.insert(red_name.to_string(), value);
                continue;
            }
            let Some(value) = self.properties.get(red_name) else {
                continue;
            };

            synth.configure(property, value);
            if registry.value_kind(property) != ValueKind::NestedObject {
                continue;
            }
            if let RedValue::Class(nested) = value {
                if depth >= registry.config().max_nesting_depth() {
                    warn!("Nesting depth {} reached at {}.{}", depth, self.class_type, red_name);
                    continue;
                }
                match nested.try_write() {
                    Some(mut nested) => skipped += nested.init_class_at(registry, depth + 1),
                    None => {
                        warn!(
                            "{}.{} is borrowed elsewhere, skipping initialization",
                            self.class_type, red_name
                        );
                        skipped += 1;
                    }
                }
            }
        }
        skipped
    }

    /// Apply the effective constructor defaults of this object's type
    ///
    /// Nested objects get their own type's defaults first, so a dotted
    /// path declared on this type overrides them.
    pub fn apply_defaults(&mut self, registry: &TypeRegistry) {
        self.apply_defaults_at(registry, 0);
    }

    fn apply_defaults_at(&mut self, registry: &TypeRegistry, depth: usize) {
        let info = registry.type_info(&self.class_type);

        if depth < registry.config().max_nesting_depth() {
            for property in info.properties() {
                if registry.value_kind(property) != ValueKind::NestedObject {
                    continue;
                }
                let Some(RedValue::Class(nested)) = self.properties.get(property.resolved_name())
                else {
                    continue;
                };
                if let Some(mut nested) = nested.try_write() {
                    nested.apply_defaults_at(registry, depth + 1);
                }
            }
        }

        for (path, literal) in info.defaults() {
            if !self.apply_literal(path, literal) {
                warn!("Could not apply default {}.{}", self.class_type, path);
            }
        }
    }

    fn apply_literal(&mut self, path: &str, literal: &Literal) -> bool {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let Some(value) = self.properties.get_mut(head) else {
            return false;
        };

        match rest {
            Some(rest) => match value {
                RedValue::Class(nested) => nested.write().apply_literal(rest, literal),
                _ => false,
            },
            None => match value.coerce_literal(literal) {
                Some(coerced) => {
                    *value = coerced;
                    true
                }
                None => false,
            },
        }
    }

    /// Get a property, recording an explicit null if it is absent
    pub fn get(&mut self, red_name: &str) -> &RedValue {
        if !self.properties.contains_key(red_name) {
            self.properties.insert(red_name.to_string(), RedValue::Null);
        }
        &self.properties[red_name]
    }

    /// Get a property converted to a concrete type
    pub fn get_as<T>(&mut self, red_name: &str) -> Result<T>
    where
        T: for<'a> TryFrom<&'a RedValue, Error = Error>,
    {
        T::try_from(self.get(red_name))
    }

    /// Look up a property without recording anything
    pub fn try_get(&self, red_name: &str) -> Option<&RedValue> {
        self.properties.get(red_name)
    }

    /// Get a mutable property value
    pub fn get_mut(&mut self, red_name: &str) -> Option<&mut RedValue> {
        self.properties.get_mut(red_name)
    }

    /// Set a property, returning the previous value
    ///
    /// The value is not checked against the declared type.
    pub fn set(
        &mut self,
        red_name: impl Into<String>,
        value: impl Into<RedValue>,
    ) -> Option<RedValue> {
        self.properties.insert(red_name.into(), value.into())
    }

    /// Set a property and notify the router's handlers if the value changed
    pub fn set_notify(
        &mut self,
        red_name: impl Into<String>,
        value: impl Into<RedValue>,
        router: &ChangeRouter<'_>,
    ) -> Option<RedValue> {
        let red_name = red_name.into();
        let previous = self.properties.insert(red_name.clone(), value.into());
        let old_value = previous.clone().unwrap_or_default();
        router.dispatch(self, &red_name, &old_value, &self.properties[red_name.as_str()]);
        previous
    }

    /// Get a property by its code-facing member name
    pub fn get_property(&mut self, registry: &TypeRegistry, member: &str) -> &RedValue {
        let red_name = registry.red_name_for(&self.class_type, member);
        self.get(&red_name)
    }

    /// Set a property by its code-facing member name
    pub fn set_property(
        &mut self,
        registry: &TypeRegistry,
        member: &str,
        value: impl Into<RedValue>,
    ) -> Option<RedValue> {
        let red_name = registry.red_name_for(&self.class_type, member);
        self.set(red_name, value)
    }

    /// Check if a property is present
    pub fn contains(&self, red_name: &str) -> bool {
        self.properties.contains_key(red_name)
    }

    /// Remove a property
    pub fn remove(&mut self, red_name: &str) -> Option<RedValue> {
        self.properties.shift_remove(red_name)
    }

    /// Number of stored properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no properties are stored
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate over stored properties in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RedValue)> {
        self.properties.iter()
    }

    /// Stored property names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.properties.keys()
    }

    /// Copy sharing nested objects and arrays with this one
    pub fn shallow_copy(&self) -> RedClass {
        self.clone()
    }

    /// Copy duplicating the whole owned containment tree
    pub fn deep_copy(&self) -> RedClass {
        Self {
            class_type: self.class_type.clone(),
            chunk: self.chunk,
            guid: self.guid,
            properties: self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.deep_copy()))
                .collect(),
        }
    }

    /// Structural equality over stored properties
    ///
    /// Key sets must match exactly; insertion order, type tag, chunk and
    /// guid are not compared.
    pub fn equals(&self, other: &RedClass) -> bool {
        if self.properties.len() != other.properties.len() {
            return false;
        }
        self.properties
            .iter()
            .all(|(key, value)| other.properties.get(key) == Some(value))
    }

    /// Flatten into a plain mapping, nested objects becoming nested mappings
    ///
    /// With `clone_first` the flattening runs on a deep copy, so nothing
    /// handed out can alias this object's nested state.
    pub fn to_dictionary(&self, clone_first: bool) -> PropertyDict {
        if clone_first {
            return self.deep_copy().to_dictionary(false);
        }

        self.properties
            .iter()
            .map(|(key, value)| {
                let entry = match value {
                    RedValue::Class(nested) => {
                        DictValue::Nested(nested.read().to_dictionary(false))
                    }
                    other => DictValue::Value(other.clone()),
                };
                (key.clone(), entry)
            })
            .collect()
    }
}

impl PartialEq for RedClass {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for RedClass {}

impl Serialize for RedClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RedClass", 2)?;
        state.serialize_field("type", &self.class_type)?;
        state.serialize_field("properties", &self.properties)?;
        state.end()
    }
}

/// Shared pointer to a nested object
#[derive(Debug, Clone)]
pub struct ClassRef(Arc<RwLock<RedClass>>);

impl ClassRef {
    /// Wrap an object
    pub fn new(class: RedClass) -> Self {
        Self(Arc::new(RwLock::new(class)))
    }

    pub(crate) fn from_arc(inner: Arc<RwLock<RedClass>>) -> Self {
        Self(inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RwLock<RedClass>> {
        Arc::downgrade(&self.0)
    }

    /// Lock for reading
    pub fn read(&self) -> RwLockReadGuard<'_, RedClass> {
        self.0.read()
    }

    /// Lock for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, RedClass> {
        self.0.write()
    }

    /// Lock for writing if nobody else holds the lock
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, RedClass>> {
        self.0.try_write()
    }

    /// Check if both point at the same object
    pub fn ptr_eq(&self, other: &ClassRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Type of the referenced object
    pub fn red_type(&self) -> TypeName {
        self.0.read_recursive().class_type.clone()
    }

    /// Duplicate the referenced object and its containment tree
    pub fn deep_copy(&self) -> ClassRef {
        ClassRef::new(self.0.read_recursive().deep_copy())
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.read_recursive().equals(&other.0.read_recursive())
    }
}

impl Eq for ClassRef {}

impl Serialize for ClassRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.read_recursive().serialize(serializer)
    }
}
