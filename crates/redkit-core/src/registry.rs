//! Type metadata registry
//!
//! The registry holds class declarations and scalar default factories,
//! populated once at startup from the schema source. Effective metadata
//! (own + inherited properties) is computed lazily on the first request
//! for a type and cached for the lifetime of the registry.
//!
//! # Concurrency
//!
//! Registration takes `&mut self`, so declarations are frozen once the
//! registry is shared. `type_info` takes `&self` and may be called from
//! many threads: each type's metadata is computed at most once, under the
//! cache's write lock, and every caller receives the same `Arc`.

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::metadata::{ClassDecl, Flags, PropertyInfo, TypeInfo, ValueKind};
use crate::value::{ArrayKind, HandleKind, RedValue, ResourceKind, SCALAR_TAGS};
use crate::TypeName;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Builds the zero value of a scalar type
pub type DefaultFactory = fn() -> RedValue;

/// Unbound generic definitions the registry understands
const GENERIC_TAGS: &[&str] = &[
    "CArray",
    "CArrayFixedSize",
    "CStatic",
    "CHandle",
    "CWeakHandle",
    "CResourceReference",
    "CResourceAsyncReference",
];

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// Registry of class metadata and default factories
#[derive(Debug)]
pub struct TypeRegistry {
    config: RegistryConfig,
    classes: IndexMap<TypeName, ClassDecl>,
    factories: HashMap<String, DefaultFactory>,
    cache: RwLock<HashMap<TypeName, Arc<TypeInfo>>>,
}

impl TypeRegistry {
    /// Create a registry with the builtin scalar factories
    pub fn new(config: RegistryConfig) -> Self {
        let factories = SCALAR_TAGS
            .iter()
            .map(|(tag, factory)| (tag.to_string(), *factory))
            .collect();
        Self {
            config,
            classes: IndexMap::new(),
            factories,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Install this registry as the process-wide registry
    pub fn install_global(self) -> Result<&'static TypeRegistry> {
        let mut pending = Some(self);
        let installed = GLOBAL.get_or_init(|| pending.take().unwrap_or_else(TypeRegistry::default));
        match pending {
            None => Ok(installed),
            Some(_) => Err(Error::GlobalRegistryInstalled),
        }
    }

    /// The process-wide registry, if one was installed
    pub fn global() -> Option<&'static TypeRegistry> {
        GLOBAL.get()
    }

    /// Registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a class declaration
    pub fn register(&mut self, decl: ClassDecl) -> Result<()> {
        if self.classes.contains_key(&decl.name) {
            return Err(Error::DuplicateClass(decl.name));
        }
        if self.config.strict_names() {
            let mut seen = HashSet::new();
            for property in &decl.properties {
                if let Some(red_name) = property.red_name() {
                    if !seen.insert(red_name) {
                        return Err(Error::DuplicateExternalName {
                            class: decl.name.clone(),
                            red_name: red_name.to_string(),
                        });
                    }
                }
            }
        }
        // Nothing can hold cached metadata while we have `&mut self`
        self.cache.get_mut().clear();
        self.classes.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Register (or replace) the zero-value factory for a scalar tag
    pub fn register_factory(&mut self, tag: impl Into<String>, factory: DefaultFactory) {
        self.cache.get_mut().clear();
        self.factories.insert(tag.into(), factory);
    }

    /// Check if a class declaration exists for `name`
    pub fn contains_class(&self, name: &TypeName) -> bool {
        self.classes.contains_key(name)
    }

    /// Registered class declarations in registration order
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.values()
    }

    /// Number of registered classes
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of types whose effective metadata has been computed
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }

    /// Check if `name` is an engine type known to this registry
    ///
    /// Unbound generic definitions such as `CArray` count as known.
    pub fn is_red_type(&self, name: &TypeName) -> bool {
        GENERIC_TAGS.contains(&name.as_str())
            || self.kind_of(name, &Flags::empty()) != ValueKind::Unknown
    }

    /// Effective metadata for a type, computed once and cached
    ///
    /// Types without a class declaration yield an empty, non-class
    /// `TypeInfo`; the caller decides whether that is fatal.
    pub fn type_info(&self, name: &TypeName) -> Arc<TypeInfo> {
        if let Some(info) = self.cache.read().get(name) {
            return Arc::clone(info);
        }

        let mut cache = self.cache.write();
        if let Some(info) = cache.get(name) {
            return Arc::clone(info);
        }
        let info = Arc::new(self.compute_type_info(name));
        debug!(
            "Computed metadata for {} ({} properties)",
            name,
            info.len()
        );
        cache.insert(name.clone(), Arc::clone(&info));
        info
    }

    /// Look up a property descriptor by its code-facing member name
    pub fn property_by_name(&self, class: &TypeName, member: &str) -> Option<PropertyInfo> {
        self.type_info(class).property_by_name(member).cloned()
    }

    /// The external name for a member, falling back to the member name
    pub fn red_name_for(&self, class: &TypeName, member: &str) -> String {
        match self.type_info(class).property_by_name(member) {
            Some(property) => property.resolved_name().to_string(),
            None => member.to_string(),
        }
    }

    /// How the default value of `property` is built
    pub fn value_kind(&self, property: &PropertyInfo) -> ValueKind {
        self.kind_of(&property.declared_type, &property.flags)
    }

    /// Classify a declared type with its flags
    pub fn kind_of(&self, declared_type: &TypeName, flags: &Flags) -> ValueKind {
        if self.classes.contains_key(declared_type) {
            return ValueKind::NestedObject;
        }

        let definition = declared_type.generic_definition();
        if declared_type.is_generic() {
            if declared_type.type_argument().is_none() {
                return ValueKind::Unknown;
            }
            let size = flags.first().unwrap_or(0) as usize;
            return match (ArrayKind::from_tag(definition), definition) {
                (Some(ArrayKind::Fixed), _) => ValueKind::FixedArray { capacity: size },
                (Some(ArrayKind::Static), _) => ValueKind::BoundedArray { max_size: size },
                (Some(ArrayKind::Dynamic), _) => ValueKind::DynamicArray,
                (None, "CHandle") => ValueKind::Reference(HandleKind::Strong),
                (None, "CWeakHandle") => ValueKind::Reference(HandleKind::Weak),
                (None, "CResourceReference") => ValueKind::Resource(ResourceKind::Sync),
                (None, "CResourceAsyncReference") => ValueKind::Resource(ResourceKind::Async),
                _ => ValueKind::Unknown,
            };
        }

        if self.factories.contains_key(definition) {
            ValueKind::Scalar
        } else {
            ValueKind::Unknown
        }
    }

    /// Zero value of a scalar type
    pub fn scalar_default(&self, name: &TypeName) -> Option<RedValue> {
        self.factories.get(name.as_str()).map(|factory| factory())
    }

    fn compute_type_info(&self, name: &TypeName) -> TypeInfo {
        let Some(decl) = self.classes.get(name) else {
            debug!("No class declaration for {}", name);
            return TypeInfo::unknown(name.clone());
        };

        let max_depth = self.config.max_inheritance_depth();
        let mut chain: Vec<TypeName> = Vec::new();
        let mut decls: Vec<&ClassDecl> = Vec::new();
        let mut current = Some(decl);

        while let Some(decl) = current {
            if chain.contains(&decl.name) {
                warn!("Inheritance cycle at {} while resolving {}", decl.name, name);
                break;
            }
            chain.push(decl.name.clone());
            decls.push(decl);

            current = match &decl.parent {
                Some(_) if chain.len() > max_depth => {
                    warn!(
                        "Inheritance chain of {} exceeds {} levels, truncating",
                        name, max_depth
                    );
                    None
                }
                Some(parent) => {
                    let found = self.classes.get(parent);
                    if found.is_none() {
                        warn!("Parent {} of {} is not registered", parent, decl.name);
                    }
                    found
                }
                None => None,
            };
        }

        let mut seen = HashSet::new();
        let mut properties = Vec::new();
        for decl in &decls {
            for property in &decl.properties {
                if let Some(red_name) = property.red_name() {
                    if !seen.insert(red_name.to_string()) {
                        warn!(
                            "{}.{} is shadowed by a more derived property",
                            decl.name, red_name
                        );
                        continue;
                    }
                }
                properties.push(property.clone());
            }
        }

        let defaults = decls
            .iter()
            .rev()
            .flat_map(|decl| decl.defaults.iter().cloned())
            .collect();

        TypeInfo::class(name.clone(), chain, properties, defaults)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
