//! Error types for the Lockstep system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;
use crate::types::Type;

/// The main error type for Lockstep operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates a constraint violation error.
    #[must_use]
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConstraintViolation(message.into()))
    }

    /// Creates an invariant violation error.
    #[must_use]
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation(message.into()))
    }

    /// Creates a not found error for a strict lookup.
    #[must_use]
    pub fn not_found(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound(description.into()))
    }

    /// Creates a not bound error for an object with no local binding.
    #[must_use]
    pub fn not_bound(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotBound(description.into()))
    }

    /// Creates an error for an operation outside an active transaction.
    #[must_use]
    pub fn no_active_context() -> Self {
        Self::new(ErrorKind::NoActiveContext)
    }

    /// Creates a schema registration error.
    #[must_use]
    pub fn schema(error: SchemaError) -> Self {
        Self::new(ErrorKind::Schema(error))
    }

    /// Returns true if retrying the enclosing transaction may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::CommitConflict(_))
    }

    /// Returns true if this error reports a broken write-time constraint.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self.kind, ErrorKind::ConstraintViolation(_))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A unique index or referential constraint would be broken by a write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A uniqueness assumption was found false at read time.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A strict lookup found no matching record.
    #[error("not found: {0}")]
    NotFound(String),

    /// A live object has no binding in this process.
    #[error("not bound: {0}")]
    NotBound(String),

    /// An operation was attempted without an active transaction.
    #[error("no active transaction")]
    NoActiveContext,

    /// A transaction could not be applied on top of a newer commit.
    #[error("commit conflict: {0}")]
    CommitConflict(String),

    /// Entity was not found in storage.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// Entity type was never registered.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Attribute is not declared on the entity type.
    #[error("unknown attribute: {attribute} on entity type {entity_type}")]
    UnknownAttribute {
        /// The entity type that was queried.
        entity_type: String,
        /// The attribute name that was not found.
        attribute: String,
    },

    /// A required attribute was not supplied.
    #[error("missing required attribute: {attribute} on entity type {entity_type}")]
    MissingAttribute {
        /// The entity type being created.
        entity_type: String,
        /// The attribute that was missing.
        attribute: String,
    },

    /// A lookup was attempted on an attribute without an index.
    #[error("attribute {attribute} on entity type {entity_type} is not indexed")]
    NotIndexed {
        /// The entity type that was queried.
        entity_type: String,
        /// The attribute that was queried.
        attribute: String,
    },

    /// Type mismatch during attribute validation.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: Type,
        /// The actual type encountered.
        actual: Type,
    },

    /// Schema registration was rejected.
    #[error("schema error: {0}")]
    Schema(SchemaError),

    /// Encoding or decoding a replicated record failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Reasons a schema declaration is rejected at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// An entity type with this name is already registered.
    DuplicateEntityType(String),
    /// Two attributes of the same name were declared on one type.
    DuplicateAttribute {
        /// The entity type.
        entity_type: String,
        /// The repeated attribute name.
        attribute: String,
    },
    /// A unique index was declared on a type without total equality.
    UnhashableUnique {
        /// The entity type.
        entity_type: String,
        /// The attribute.
        attribute: String,
        /// The attribute's value type.
        ty: Type,
    },
    /// `cascade-delete-by` was declared on a non-reference attribute.
    CascadeOnNonReference {
        /// The entity type.
        entity_type: String,
        /// The attribute.
        attribute: String,
    },
    /// A reference names an entity type that is not registered.
    UnknownReferenceTarget {
        /// The entity type.
        entity_type: String,
        /// The attribute.
        attribute: String,
        /// The missing target type.
        target: String,
    },
    /// A cascade-delete reference would close a cycle.
    CascadeCycle {
        /// The entity type whose registration closes the cycle.
        entity_type: String,
        /// The cycle, as a path of entity type names.
        path: Vec<String>,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateEntityType(name) => {
                write!(f, "entity type already registered: {name}")
            }
            Self::DuplicateAttribute {
                entity_type,
                attribute,
            } => write!(f, "duplicate attribute {attribute} on {entity_type}"),
            Self::UnhashableUnique {
                entity_type,
                attribute,
                ty,
            } => write!(
                f,
                "unique attribute {attribute} on {entity_type} has non-hashable type {ty}"
            ),
            Self::CascadeOnNonReference {
                entity_type,
                attribute,
            } => write!(
                f,
                "cascade-delete-by on non-reference attribute {attribute} of {entity_type}"
            ),
            Self::UnknownReferenceTarget {
                entity_type,
                attribute,
                target,
            } => write!(
                f,
                "attribute {attribute} on {entity_type} references unregistered type {target}"
            ),
            Self::CascadeCycle { entity_type, path } => write!(
                f,
                "cascade-delete cycle through {entity_type}: {}",
                path.join(" -> ")
            ),
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Entity type involved in the failing operation.
    pub entity_type: Option<String>,
    /// Attribute involved in the failing operation.
    pub attribute: Option<String>,
    /// Operations that were in progress, outermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entity type.
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Sets the attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.entity_type, &self.attribute) {
            (Some(ty), Some(attr)) => write!(f, "at {ty}.{attr}")?,
            (Some(ty), None) => write!(f, "at {ty}")?,
            (None, Some(attr)) => write!(f, "at .{attr}")?,
            (None, None) => {}
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
