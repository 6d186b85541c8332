//! Typed shapes of the bridge's entity types.
//!
//! Each entity type has a fixed attribute set, so records are decoded into
//! closed Rust types instead of being read attribute-by-attribute.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lockstep_foundation::{EntityId, Error, ErrorKind, Result, Type, Value};
use lockstep_storage::{AttributeSchema, EntityRecord, EntityTypeSchema};

use crate::project::{Project, ProjectId};

/// Entity type name of the distributable identity.
pub const SHARED_ENTITY: &str = "SharedEntity";
/// Unique project identifier attribute of `SharedEntity`.
pub const PROJECT_ID: &str = "projectId";
/// Entity type name of the process-local binding.
pub const LOCAL_ENTITY: &str = "LocalEntity";
/// Cascade-deleting reference from `LocalEntity` to `SharedEntity`.
pub const SHARED_REF: &str = "sharedEntity";
/// Transient live object attribute of `LocalEntity`.
pub const LIVE_OBJECT: &str = "liveObject";

/// The distributable half of a project identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SharedEntity {
    /// Entity ID in the store it was read from.
    pub id: EntityId,
    /// The project's serializable identifier.
    pub project_id: ProjectId,
}

impl SharedEntity {
    /// Returns the `SharedEntity` type declaration.
    #[must_use]
    pub fn schema() -> EntityTypeSchema {
        EntityTypeSchema::new(SHARED_ENTITY)
            .with_attribute(AttributeSchema::value(PROJECT_ID, Type::String).unique())
    }

    /// Decodes a stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is not a well-formed `SharedEntity`.
    pub fn from_record(record: &EntityRecord) -> Result<Self> {
        expect_type(record, SHARED_ENTITY)?;
        let project_id = record
            .get(PROJECT_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(record, PROJECT_ID))?;
        Ok(Self {
            id: record.id,
            project_id: ProjectId::from(project_id),
        })
    }

    /// Returns the index key for a project identifier.
    #[must_use]
    pub fn key(project_id: &ProjectId) -> Value {
        Value::from(project_id.as_str())
    }
}

impl fmt::Display for SharedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedEntity({}, projectId={})", self.id, self.project_id)
    }
}

/// Returns the `LocalEntity` type declaration.
///
/// `sharedEntity` is unique, so a process holds at most one binding per
/// shared identity. `liveObject` is indexed for reverse lookup.
#[must_use]
pub fn local_entity_schema() -> EntityTypeSchema {
    EntityTypeSchema::new(LOCAL_ENTITY)
        .with_attribute(
            AttributeSchema::reference(SHARED_REF, SHARED_ENTITY)
                .cascade_delete_by()
                .unique(),
        )
        .with_attribute(AttributeSchema::transient(LIVE_OBJECT).indexed())
        .local()
}

/// Returns true if a `LocalEntity` record's live object has been dropped.
#[must_use]
pub(crate) fn is_stale(record: &EntityRecord) -> bool {
    record
        .get(LIVE_OBJECT)
        .and_then(Value::as_live)
        .is_some_and(|live| !live.is_alive())
}

/// The process-local half of a project identity.
pub struct LocalEntity<P> {
    /// Entity ID of this binding.
    pub id: EntityId,
    /// Entity ID of the referenced `SharedEntity`.
    pub shared: EntityId,
    /// The bound live object.
    pub project: Arc<P>,
}

impl<P: Project> LocalEntity<P> {
    /// Returns the `LocalEntity` type declaration.
    #[must_use]
    pub fn schema() -> EntityTypeSchema {
        local_entity_schema()
    }

    /// Decodes a stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is not a well-formed `LocalEntity`, or
    /// its live object is not a `P` or has been dropped by the host.
    pub fn from_record(record: &EntityRecord) -> Result<Self> {
        expect_type(record, LOCAL_ENTITY)?;
        let shared = record
            .get(SHARED_REF)
            .and_then(Value::as_entity)
            .ok_or_else(|| malformed(record, SHARED_REF))?;
        let live = record
            .get(LIVE_OBJECT)
            .and_then(Value::as_live)
            .ok_or_else(|| malformed(record, LIVE_OBJECT))?;
        if !live.is_alive() {
            return Err(Error::invariant_violation(format!(
                "the live object of {} has been dropped",
                record.id
            )));
        }
        let project = live
            .downcast::<P>()
            .ok_or_else(|| {
                Error::invariant_violation(format!(
                    "{} holds a live object that is not a {}",
                    record.id,
                    std::any::type_name::<P>()
                ))
            })?;
        Ok(Self {
            id: record.id,
            shared,
            project,
        })
    }
}

impl<P> Clone for LocalEntity<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: self.shared,
            project: Arc::clone(&self.project),
        }
    }
}

impl<P> PartialEq for LocalEntity<P> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.shared == other.shared && Arc::ptr_eq(&self.project, &other.project)
    }
}

impl<P> Eq for LocalEntity<P> {}

impl<P: Project> fmt::Debug for LocalEntity<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEntity")
            .field("id", &self.id)
            .field("shared", &self.shared)
            .field("project", &self.project.describe())
            .finish()
    }
}

/// Any entity of the bridge's types.
pub enum BridgeEntity<P> {
    /// A distributable identity.
    Shared(SharedEntity),
    /// A process-local binding.
    Local(LocalEntity<P>),
}

impl<P: Project> BridgeEntity<P> {
    /// Decodes a record by its entity type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` for types the bridge does not define, or
    /// any decoding error of the specific type.
    pub fn decode(record: &EntityRecord) -> Result<Self> {
        match &*record.entity_type {
            SHARED_ENTITY => SharedEntity::from_record(record).map(Self::Shared),
            LOCAL_ENTITY => LocalEntity::from_record(record).map(Self::Local),
            other => Err(Error::new(ErrorKind::UnknownEntityType(other.to_string()))),
        }
    }

    /// Returns the entity's ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Shared(shared) => shared.id,
            Self::Local(local) => local.id,
        }
    }
}

impl<P> Clone for BridgeEntity<P> {
    fn clone(&self) -> Self {
        match self {
            Self::Shared(shared) => Self::Shared(shared.clone()),
            Self::Local(local) => Self::Local(local.clone()),
        }
    }
}

impl<P> PartialEq for BridgeEntity<P> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Shared(a), Self::Shared(b)) => a == b,
            (Self::Local(a), Self::Local(b)) => a == b,
            _ => false,
        }
    }
}

impl<P> Eq for BridgeEntity<P> {}

impl<P: Project> fmt::Debug for BridgeEntity<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(shared) => f.debug_tuple("Shared").field(shared).finish(),
            Self::Local(local) => f.debug_tuple("Local").field(local).finish(),
        }
    }
}

fn expect_type(record: &EntityRecord, entity_type: &str) -> Result<()> {
    if record.is_a(entity_type) {
        Ok(())
    } else {
        Err(Error::invariant_violation(format!(
            "{} is a {}, not a {entity_type}",
            record.id, record.entity_type
        )))
    }
}

fn malformed(record: &EntityRecord, attribute: &str) -> Error {
    Error::invariant_violation(format!(
        "{} {} has no well-formed {attribute}",
        record.entity_type, record.id
    ))
}
