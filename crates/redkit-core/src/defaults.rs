//! Default value synthesis from property metadata

use crate::class::{ClassRef, RedClass};
use crate::metadata::{Flags, PropertyInfo, ValueKind};
use crate::registry::TypeRegistry;
use crate::value::{ArrayKind, RedArray, RedHandle, RedValue, ResourceRef};
use crate::TypeName;
use tracing::warn;

/// Builds default values for absent properties
///
/// Synthesis only reads the registry; the returned value is the only
/// thing it produces.
pub struct DefaultSynthesizer<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> DefaultSynthesizer<'r> {
    /// Create a synthesizer backed by `registry`
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Build the default value of `property` for an object at `depth`
    ///
    /// Construction happens first; bounded arrays are then configured
    /// with their maximum size as a separate step.
    pub fn synthesize(&self, property: &PropertyInfo, depth: usize) -> RedValue {
        let value = self.construct(&property.declared_type, &property.flags, depth);
        self.configure(property, &value);
        value
    }

    /// Apply post-construction configuration to an existing value
    ///
    /// Bounded arrays receive their maximum size from the first flag.
    pub fn configure(&self, property: &PropertyInfo, value: &RedValue) {
        if let ValueKind::BoundedArray { max_size } = self.registry.value_kind(property) {
            if let Some(array) = value.as_array() {
                array.write().set_max_size(Some(max_size));
            }
        }
    }

    fn construct(&self, declared_type: &TypeName, flags: &Flags, depth: usize) -> RedValue {
        let element = || declared_type.type_argument().unwrap_or_default();

        match self.registry.kind_of(declared_type, flags) {
            ValueKind::Scalar => self
                .registry
                .scalar_default(declared_type)
                .unwrap_or_default(),
            ValueKind::FixedArray { capacity } => {
                let element = element();
                let items = (0..capacity)
                    .map(|_| self.construct(&element, &Flags::empty(), depth))
                    .collect();
                RedArray::fixed(element, items).into()
            }
            ValueKind::BoundedArray { .. } => RedArray::new(ArrayKind::Static, element()).into(),
            ValueKind::DynamicArray => RedArray::new(ArrayKind::Dynamic, element()).into(),
            ValueKind::NestedObject => {
                if depth >= self.registry.config().max_nesting_depth() {
                    warn!(
                        "Nesting depth {} reached, leaving {} uninitialized",
                        depth, declared_type
                    );
                    return RedValue::Null;
                }
                let mut nested = RedClass::new(declared_type.clone());
                nested.init_class_at(self.registry, depth + 1);
                RedValue::Class(ClassRef::new(nested))
            }
            ValueKind::Reference(kind) => RedValue::Handle(RedHandle::empty(kind, element())),
            ValueKind::Resource(kind) => {
                RedValue::Resource(ResourceRef::new(kind, element(), String::new()))
            }
            ValueKind::Unknown => {
                warn!("No default for unknown type {}", declared_type);
                RedValue::Null
            }
        }
    }
}
