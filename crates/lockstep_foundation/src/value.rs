//! Attribute values.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::entity::EntityId;
use crate::types::Type;

/// An attribute value.
///
/// Values are immutable and cheaply cloneable. Every variant except
/// [`Value::Live`] is serializable; `Live` values are bound to the process
/// that created them.
#[derive(Clone)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// String value.
    String(Arc<str>),
    /// Entity reference.
    EntityRef(EntityId),
    /// Process-local live object.
    Live(LiveRef),
}

/// Lookup-only handle to a process-local object.
///
/// The handle is weak: the host runtime owns the object and may drop it at
/// any time, after which [`downcast`](Self::downcast) returns `None`.
/// Equality and hashing use the address of the allocation, which the weak
/// count keeps reserved, so two handles are equal exactly when they were
/// made from the same object.
#[derive(Clone)]
pub struct LiveRef(Weak<dyn Any + Send + Sync>);

impl LiveRef {
    /// Creates a handle to a shared live object without taking ownership.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(object: &Arc<T>) -> Self {
        let weak: Weak<dyn Any + Send + Sync> = Arc::downgrade(object) as Weak<T>;
        Self(weak)
    }

    /// Returns true while the host still holds the object.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Returns the object as `T` if it is still alive and that is its
    /// concrete type.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.upgrade()?.downcast::<T>().ok()
    }

    /// Returns true if this handle was made from `object`.
    #[must_use]
    pub fn points_to<T: Any + Send + Sync>(&self, object: &Arc<T>) -> bool {
        self.addr() == Arc::as_ptr(object).cast::<()>()
    }

    fn addr(&self) -> *const () {
        self.0.as_ptr().cast::<()>()
    }
}

impl PartialEq for LiveRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.addr(), other.addr())
    }
}

impl Eq for LiveRef {}

impl Hash for LiveRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.addr() as usize).hash(state);
    }
}

impl fmt::Debug for LiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiveRef({:p})", self.addr())
    }
}

impl Value {
    /// Returns the type of this value.
    #[must_use]
    pub const fn value_type(&self) -> Type {
        match self {
            Self::Bool(_) => Type::Bool,
            Self::Int(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::String(_) => Type::String,
            Self::EntityRef(_) => Type::EntityRef,
            Self::Live(_) => Type::Live,
        }
    }

    /// Attempts to extract a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a float value.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract an entity ID.
    #[must_use]
    pub const fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Attempts to extract a live object handle.
    #[must_use]
    pub const fn as_live(&self) -> Option<&LiveRef> {
        match self {
            Self::Live(live) => Some(live),
            _ => None,
        }
    }

    /// Creates a lookup-only handle to a shared live object.
    #[must_use]
    pub fn live<T: std::any::Any + Send + Sync>(object: &Arc<T>) -> Self {
        Self::Live(LiveRef::new(object))
    }
}

// Implement PartialEq manually to handle float comparison
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::EntityRef(a), Self::EntityRef(b)) => a == b,
            (Self::Live(a), Self::Live(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Bool(b) => b.hash(state),
            Self::Int(n) => n.hash(state),
            Self::Float(n) => n.to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::EntityRef(id) => id.hash(state),
            Self::Live(live) => live.hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::EntityRef(id) => write!(f, "{id:?}"),
            Self::Live(live) => write!(f, "{live:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::EntityRef(id) => write!(f, "{id}"),
            Self::Live(_) => write!(f, "<live>"),
        }
    }
}

#[cfg(feature = "serde")]
mod serde_support {
    use super::{EntityId, Value};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    enum ValueRef<'a> {
        Bool(bool),
        Int(i64),
        Float(f64),
        String(&'a str),
        EntityRef(EntityId),
    }

    #[derive(Deserialize)]
    enum ValueRepr {
        Bool(bool),
        Int(i64),
        Float(f64),
        String(String),
        EntityRef(EntityId),
    }

    impl Serialize for Value {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let repr = match self {
                Self::Bool(b) => ValueRef::Bool(*b),
                Self::Int(n) => ValueRef::Int(*n),
                Self::Float(n) => ValueRef::Float(*n),
                Self::String(s) => ValueRef::String(s),
                Self::EntityRef(id) => ValueRef::EntityRef(*id),
                Self::Live(_) => {
                    return Err(serde::ser::Error::custom(
                        "live values are process-local and cannot be serialized",
                    ));
                }
            };
            repr.serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Value {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(match ValueRepr::deserialize(deserializer)? {
                ValueRepr::Bool(b) => Self::Bool(b),
                ValueRepr::Int(n) => Self::Int(n),
                ValueRepr::Float(n) => Self::Float(n),
                ValueRepr::String(s) => Self::String(s.into()),
                ValueRepr::EntityRef(id) => Self::EntityRef(id),
            })
        }
    }
}

// Convenience From implementations

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Self::String(s)
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Self::EntityRef(id)
    }
}

impl From<LiveRef> for Value {
    fn from(live: LiveRef) -> Self {
        Self::Live(live)
    }
}
