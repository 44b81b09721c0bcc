//! Tagged property values for reflected engine objects

use crate::class::{ClassRef, RedClass};
use crate::error::{Error, Result};
use crate::identity::TypeName;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, Weak};

/// A property value held by a [`RedClass`]
///
/// Scalars and resource references are plain leaves copied by value.
/// Arrays and nested classes are shared by `clone` and duplicated by
/// [`RedValue::deep_copy`]. Handles are non-owning and always copied by
/// reference.
#[derive(Debug, Clone, Default, Serialize)]
pub enum RedValue {
    /// No value (recorded by a lookup of an absent property)
    #[default]
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    /// Engine name (`CName`)
    Name(String),
    /// Tweak database record id
    TweakDbId(u64),
    Array(ArrayRef),
    Handle(RedHandle),
    Resource(ResourceRef),
    /// Owned nested object
    Class(ClassRef),
}

/// Scalar tags and their zero values
pub(crate) const SCALAR_TAGS: &[(&str, fn() -> RedValue)] = &[
    ("CBool", || RedValue::Bool(false)),
    ("CInt8", || RedValue::Int8(0)),
    ("CInt16", || RedValue::Int16(0)),
    ("CInt32", || RedValue::Int32(0)),
    ("CInt64", || RedValue::Int64(0)),
    ("CUInt8", || RedValue::UInt8(0)),
    ("CUInt16", || RedValue::UInt16(0)),
    ("CUInt32", || RedValue::UInt32(0)),
    ("CUInt64", || RedValue::UInt64(0)),
    ("CFloat", || RedValue::Float(0.0)),
    ("CDouble", || RedValue::Double(0.0)),
    ("CString", || RedValue::String(String::new())),
    ("CName", || RedValue::Name(String::new())),
    ("TweakDBID", || RedValue::TweakDbId(0)),
];

impl RedValue {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, RedValue::Null)
    }

    /// The runtime engine type of this value, `None` for null
    pub fn red_type(&self) -> Option<TypeName> {
        let tag = match self {
            RedValue::Null => return None,
            RedValue::Bool(_) => "CBool",
            RedValue::Int8(_) => "CInt8",
            RedValue::Int16(_) => "CInt16",
            RedValue::Int32(_) => "CInt32",
            RedValue::Int64(_) => "CInt64",
            RedValue::UInt8(_) => "CUInt8",
            RedValue::UInt16(_) => "CUInt16",
            RedValue::UInt32(_) => "CUInt32",
            RedValue::UInt64(_) => "CUInt64",
            RedValue::Float(_) => "CFloat",
            RedValue::Double(_) => "CDouble",
            RedValue::String(_) => "CString",
            RedValue::Name(_) => "CName",
            RedValue::TweakDbId(_) => "TweakDBID",
            RedValue::Array(array) => return Some(array.red_type()),
            RedValue::Handle(handle) => return Some(handle.red_type()),
            RedValue::Resource(resource) => return Some(resource.red_type()),
            RedValue::Class(class) => return Some(class.red_type()),
        };
        Some(TypeName::new(tag))
    }

    /// Human readable type label for error messages
    pub fn type_label(&self) -> String {
        self.red_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".to_string())
    }

    /// Duplicate this value, breaking aliasing of owned nested objects
    pub fn deep_copy(&self) -> RedValue {
        match self {
            RedValue::Array(array) => RedValue::Array(array.deep_copy()),
            RedValue::Class(class) => RedValue::Class(class.deep_copy()),
            other => other.clone(),
        }
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as a signed integer of any width
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RedValue::Int8(i) => Some(*i as i64),
            RedValue::Int16(i) => Some(*i as i64),
            RedValue::Int32(i) => Some(*i as i64),
            RedValue::Int64(i) => Some(*i),
            RedValue::UInt8(i) => Some(*i as i64),
            RedValue::UInt16(i) => Some(*i as i64),
            RedValue::UInt32(i) => Some(*i as i64),
            RedValue::UInt64(i) => i64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Try to get this value as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RedValue::Float(f) => Some(*f as f64),
            RedValue::Double(f) => Some(*f),
            _ => self.as_i64().map(|i| i as f64),
        }
    }

    /// Try to get this value as a string (`CString` or `CName`)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RedValue::String(s) | RedValue::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as an array
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            RedValue::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Try to get this value as a nested object
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            RedValue::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Try to get this value as a handle
    pub fn as_handle(&self) -> Option<&RedHandle> {
        match self {
            RedValue::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    /// Try to get this value as a resource reference
    pub fn as_resource(&self) -> Option<&ResourceRef> {
        match self {
            RedValue::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    /// Convert a declarative literal into the variant of this value
    ///
    /// Returns `None` when the literal does not fit (wrong kind or out of range).
    pub fn coerce_literal(&self, literal: &Literal) -> Option<RedValue> {
        let value = match (self, literal) {
            (RedValue::Bool(_), Literal::Bool(b)) => RedValue::Bool(*b),
            (RedValue::Int8(_), Literal::Int(i)) => RedValue::Int8(i8::try_from(*i).ok()?),
            (RedValue::Int16(_), Literal::Int(i)) => RedValue::Int16(i16::try_from(*i).ok()?),
            (RedValue::Int32(_), Literal::Int(i)) => RedValue::Int32(i32::try_from(*i).ok()?),
            (RedValue::Int64(_), Literal::Int(i)) => RedValue::Int64(*i),
            (RedValue::UInt8(_), Literal::Int(i)) => RedValue::UInt8(u8::try_from(*i).ok()?),
            (RedValue::UInt16(_), Literal::Int(i)) => RedValue::UInt16(u16::try_from(*i).ok()?),
            (RedValue::UInt32(_), Literal::Int(i)) => RedValue::UInt32(u32::try_from(*i).ok()?),
            (RedValue::UInt64(_), Literal::Int(i)) => RedValue::UInt64(u64::try_from(*i).ok()?),
            (RedValue::TweakDbId(_), Literal::Int(i)) => {
                RedValue::TweakDbId(u64::try_from(*i).ok()?)
            }
            (RedValue::Float(_), Literal::Float(f)) => RedValue::Float(*f as f32),
            (RedValue::Float(_), Literal::Int(i)) => RedValue::Float(*i as f32),
            (RedValue::Double(_), Literal::Float(f)) => RedValue::Double(*f),
            (RedValue::Double(_), Literal::Int(i)) => RedValue::Double(*i as f64),
            (RedValue::String(_), Literal::String(s)) => RedValue::String(s.clone()),
            (RedValue::Name(_), Literal::String(s)) => RedValue::Name(s.clone()),
            (RedValue::Resource(r), Literal::String(s)) => {
                RedValue::Resource(ResourceRef::new(r.kind, r.target.clone(), s.clone()))
            }
            _ => return None,
        };
        Some(value)
    }
}

fn float_eq(a: f64, b: f64) -> bool {
    // NaN compares equal to itself so structural equality stays reflexive
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for RedValue {
    fn eq(&self, other: &Self) -> bool {
        use RedValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int8(a), Int8(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt8(a), UInt8(b)) => a == b,
            (UInt16(a), UInt16(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (Float(a), Float(b)) => float_eq(*a as f64, *b as f64),
            (Double(a), Double(b)) => float_eq(*a, *b),
            (String(a), String(b)) => a == b,
            (Name(a), Name(b)) => a == b,
            (TweakDbId(a), TweakDbId(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Handle(a), Handle(b)) => a == b,
            (Resource(a), Resource(b)) => a == b,
            (Class(a), Class(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for RedValue {}

impl fmt::Display for RedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedValue::Null => write!(f, "null"),
            RedValue::Bool(b) => write!(f, "{}", b),
            RedValue::Int8(i) => write!(f, "{}", i),
            RedValue::Int16(i) => write!(f, "{}", i),
            RedValue::Int32(i) => write!(f, "{}", i),
            RedValue::Int64(i) => write!(f, "{}", i),
            RedValue::UInt8(i) => write!(f, "{}", i),
            RedValue::UInt16(i) => write!(f, "{}", i),
            RedValue::UInt32(i) => write!(f, "{}", i),
            RedValue::UInt64(i) => write!(f, "{}", i),
            RedValue::Float(fl) => write!(f, "{}", fl),
            RedValue::Double(fl) => write!(f, "{}", fl),
            RedValue::String(s) => write!(f, "\"{}\"", s),
            RedValue::Name(s) => write!(f, "n\"{}\"", s),
            RedValue::TweakDbId(id) => write!(f, "t{:#x}", id),
            RedValue::Array(array) => {
                let array = array.read();
                write!(f, "[")?;
                for (i, v) in array.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            RedValue::Handle(handle) => match handle.is_set() {
                true => write!(f, "{}(..)", handle.red_type()),
                false => write!(f, "{}(null)", handle.red_type()),
            },
            RedValue::Resource(resource) => write!(f, "r\"{}\"", resource.path),
            RedValue::Class(class) => {
                let class = class.read();
                write!(f, "{}{{", class.class_type())?;
                for (i, (k, v)) in class.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! scalar_conversions {
    ($($variant:ident($ty:ty) => $tag:literal),* $(,)?) => {
        $(
            impl From<$ty> for RedValue {
                fn from(v: $ty) -> Self {
                    RedValue::$variant(v)
                }
            }

            impl TryFrom<&RedValue> for $ty {
                type Error = Error;

                fn try_from(value: &RedValue) -> Result<Self> {
                    match value {
                        RedValue::$variant(v) => Ok(v.clone()),
                        other => Err(Error::TypeError {
                            expected: $tag.to_string(),
                            got: other.type_label(),
                        }),
                    }
                }
            }
        )*
    };
}

scalar_conversions! {
    Bool(bool) => "CBool",
    Int8(i8) => "CInt8",
    Int16(i16) => "CInt16",
    Int32(i32) => "CInt32",
    Int64(i64) => "CInt64",
    UInt8(u8) => "CUInt8",
    UInt16(u16) => "CUInt16",
    UInt32(u32) => "CUInt32",
    UInt64(u64) => "CUInt64",
    Float(f32) => "CFloat",
    Double(f64) => "CDouble",
    String(String) => "CString",
}

impl From<&str> for RedValue {
    fn from(s: &str) -> Self {
        RedValue::String(s.to_string())
    }
}

impl From<RedArray> for RedValue {
    fn from(array: RedArray) -> Self {
        RedValue::Array(ArrayRef::new(array))
    }
}

impl From<ArrayRef> for RedValue {
    fn from(array: ArrayRef) -> Self {
        RedValue::Array(array)
    }
}

impl From<RedHandle> for RedValue {
    fn from(handle: RedHandle) -> Self {
        RedValue::Handle(handle)
    }
}

impl From<ResourceRef> for RedValue {
    fn from(resource: ResourceRef) -> Self {
        RedValue::Resource(resource)
    }
}

impl From<ClassRef> for RedValue {
    fn from(class: ClassRef) -> Self {
        RedValue::Class(class)
    }
}

impl From<RedClass> for RedValue {
    fn from(class: RedClass) -> Self {
        RedValue::Class(ClassRef::new(class))
    }
}

/// Container flavour of a [`RedArray`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayKind {
    /// Growable array (`CArray<T>`)
    Dynamic,
    /// Fixed length array pre-filled to capacity (`CArrayFixedSize<T>`)
    Fixed,
    /// Bounded array with a configured maximum size (`CStatic<T>`)
    Static,
}

impl ArrayKind {
    /// Engine tag of the generic definition
    pub fn tag(&self) -> &'static str {
        match self {
            ArrayKind::Dynamic => "CArray",
            ArrayKind::Fixed => "CArrayFixedSize",
            ArrayKind::Static => "CStatic",
        }
    }

    /// Look up the kind for a generic definition tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CArray" => Some(ArrayKind::Dynamic),
            "CArrayFixedSize" => Some(ArrayKind::Fixed),
            "CStatic" => Some(ArrayKind::Static),
            _ => None,
        }
    }
}

/// An array property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedArray {
    kind: ArrayKind,
    element_type: TypeName,
    items: Vec<RedValue>,
    max_size: Option<usize>,
}

impl RedArray {
    /// Create an empty array
    pub fn new(kind: ArrayKind, element_type: impl Into<TypeName>) -> Self {
        Self {
            kind,
            element_type: element_type.into(),
            items: Vec::new(),
            max_size: None,
        }
    }

    /// Create a fixed array holding exactly `items`
    pub fn fixed(element_type: impl Into<TypeName>, items: Vec<RedValue>) -> Self {
        let max_size = Some(items.len());
        Self {
            kind: ArrayKind::Fixed,
            element_type: element_type.into(),
            items,
            max_size,
        }
    }

    /// Container flavour
    pub fn kind(&self) -> ArrayKind {
        self.kind
    }

    /// Declared element type
    pub fn element_type(&self) -> &TypeName {
        &self.element_type
    }

    /// Runtime engine type, e.g. `CStatic<CUInt8>`
    pub fn red_type(&self) -> TypeName {
        TypeName::generic(self.kind.tag(), &self.element_type)
    }

    /// Configured maximum size, if bounded
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Configure the maximum size
    pub fn set_max_size(&mut self, max_size: Option<usize>) {
        self.max_size = max_size;
    }

    /// Append an element, respecting the maximum size
    pub fn push(&mut self, value: impl Into<RedValue>) -> Result<()> {
        if let Some(max_size) = self.max_size {
            if self.items.len() >= max_size {
                return Err(Error::CapacityExceeded { max_size });
            }
        }
        self.items.push(value.into());
        Ok(())
    }

    /// Get an element
    pub fn get(&self, index: usize) -> Option<&RedValue> {
        self.items.get(index)
    }

    /// Get a mutable element
    pub fn get_mut(&mut self, index: usize) -> Option<&mut RedValue> {
        self.items.get_mut(index)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the array is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over elements
    pub fn iter(&self) -> impl Iterator<Item = &RedValue> {
        self.items.iter()
    }

    /// Elements as a slice
    pub fn items(&self) -> &[RedValue] {
        &self.items
    }

    /// Duplicate the array and every element in it
    pub fn deep_copy(&self) -> RedArray {
        Self {
            kind: self.kind,
            element_type: self.element_type.clone(),
            items: self.items.iter().map(RedValue::deep_copy).collect(),
            max_size: self.max_size,
        }
    }
}

/// Shared pointer to a [`RedArray`]
///
/// Arrays are held the same way as nested objects: cloning an `ArrayRef`
/// shares the array, [`ArrayRef::deep_copy`] duplicates it.
#[derive(Debug, Clone)]
pub struct ArrayRef(Arc<RwLock<RedArray>>);

impl ArrayRef {
    /// Wrap an array in a new shared pointer
    pub fn new(array: RedArray) -> Self {
        Self(Arc::new(RwLock::new(array)))
    }

    /// Lock the array for reading
    pub fn read(&self) -> RwLockReadGuard<'_, RedArray> {
        self.0.read()
    }

    /// Lock the array for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, RedArray> {
        self.0.write()
    }

    /// Check if both pointers share the same array
    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Append an element, respecting the maximum size
    pub fn push(&self, value: impl Into<RedValue>) -> Result<()> {
        self.0.write().push(value)
    }

    pub fn len(&self) -> usize {
        self.0.read_recursive().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read_recursive().is_empty()
    }

    /// Runtime engine type of the shared array
    pub fn red_type(&self) -> TypeName {
        self.0.read_recursive().red_type()
    }

    /// Duplicate the array and everything it owns
    pub fn deep_copy(&self) -> ArrayRef {
        ArrayRef::new(self.0.read_recursive().deep_copy())
    }
}

impl PartialEq for ArrayRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.read_recursive() == *other.0.read_recursive()
    }
}

impl Eq for ArrayRef {}

impl Serialize for ArrayRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.read_recursive().serialize(serializer)
    }
}

/// Ownership strength of a [`RedHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// `CHandle<T>`
    Strong,
    /// `CWeakHandle<T>`
    Weak,
}

impl HandleKind {
    /// Engine tag of the generic definition
    pub fn tag(&self) -> &'static str {
        match self {
            HandleKind::Strong => "CHandle",
            HandleKind::Weak => "CWeakHandle",
        }
    }
}

/// Non-owning cross-reference to an object held by an external container
///
/// The referent's lifecycle belongs to the container; a handle never keeps
/// it alive and is never duplicated by a deep copy.
#[derive(Debug, Clone)]
pub struct RedHandle {
    kind: HandleKind,
    target: TypeName,
    referent: Option<Weak<RwLock<RedClass>>>,
}

impl RedHandle {
    /// Create an unset handle
    pub fn empty(kind: HandleKind, target: impl Into<TypeName>) -> Self {
        Self {
            kind,
            target: target.into(),
            referent: None,
        }
    }

    /// Create a handle pointing at `class`
    pub fn to(kind: HandleKind, class: &ClassRef) -> Self {
        Self {
            kind,
            target: class.red_type(),
            referent: Some(class.downgrade()),
        }
    }

    /// Handle strength
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Declared target type
    pub fn target(&self) -> &TypeName {
        &self.target
    }

    /// Runtime engine type, e.g. `CHandle<entEntity>`
    pub fn red_type(&self) -> TypeName {
        TypeName::generic(self.kind.tag(), &self.target)
    }

    /// Check if the handle was ever pointed at an object
    pub fn is_set(&self) -> bool {
        self.referent.is_some()
    }

    /// Resolve the referent if the container still holds it
    pub fn resolve(&self) -> Option<ClassRef> {
        self.referent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(ClassRef::from_arc)
    }
}

impl PartialEq for RedHandle {
    fn eq(&self, other: &Self) -> bool {
        let same_referent = match (&self.referent, &other.referent) {
            (None, None) => true,
            (Some(a), Some(b)) => Weak::ptr_eq(a, b),
            _ => false,
        };
        self.kind == other.kind && self.target == other.target && same_referent
    }
}

impl Eq for RedHandle {}

impl Serialize for RedHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RedHandle", 3)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("target", &self.target)?;
        state.serialize_field("set", &self.is_set())?;
        state.end()
    }
}

/// Loading mode of a [`ResourceRef`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// `CResourceReference<T>`
    Sync,
    /// `CResourceAsyncReference<T>`
    Async,
}

impl ResourceKind {
    /// Engine tag of the generic definition
    pub fn tag(&self) -> &'static str {
        match self {
            ResourceKind::Sync => "CResourceReference",
            ResourceKind::Async => "CResourceAsyncReference",
        }
    }
}

/// Reference to a depot resource by path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub target: TypeName,
    pub path: String,
}

impl ResourceRef {
    /// Create a resource reference
    pub fn new(kind: ResourceKind, target: impl Into<TypeName>, path: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            path: path.into(),
        }
    }

    /// Runtime engine type, e.g. `CResourceAsyncReference<worldEffect>`
    pub fn red_type(&self) -> TypeName {
        TypeName::generic(self.kind.tag(), &self.target)
    }
}

/// A scalar literal used in declarative constructor defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}
