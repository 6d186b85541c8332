//! Type descriptors for attribute validation.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Type descriptor for attribute validation.
///
/// Used to declare attribute value types and validate values at runtime.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// String type.
    String,
    /// Entity reference type.
    EntityRef,
    /// Process-local live object (never serialized).
    Live,
}

impl Type {
    /// Returns true if values of this type have total equality and a stable hash.
    ///
    /// Only hashable types may back a unique index.
    #[must_use]
    pub const fn is_hashable(self) -> bool {
        !matches!(self, Self::Float)
    }

    /// Returns true if values of this type may cross a process boundary.
    #[must_use]
    pub const fn is_serializable(self) -> bool {
        !matches!(self, Self::Live)
    }

    /// Checks if a value type is accepted by this type.
    ///
    /// Types must match exactly, except that `Float` accepts `Int`.
    #[must_use]
    pub fn accepts(self, value_type: Type) -> bool {
        matches!(
            (self, value_type),
            (Self::Bool, Self::Bool)
                | (Self::Int | Self::Float, Self::Int)
                | (Self::Float, Self::Float)
                | (Self::String, Self::String)
                | (Self::EntityRef, Self::EntityRef)
                | (Self::Live, Self::Live)
        )
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::EntityRef => write!(f, "entity-ref"),
            Self::Live => write!(f, "live"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
