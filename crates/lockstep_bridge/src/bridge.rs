//! Binding distributable project identities to process-local objects.
//!
//! Every project has one `SharedEntity` (keyed by its serializable
//! [`ProjectId`]) and, in each process holding a live object for it, one
//! `LocalEntity` that references the shared half and carries the live object
//! as a transient attribute. Deleting the `SharedEntity` cascades to every
//! `LocalEntity` bound to it.
//!
//! All operations run inside a [`Transaction`]. Writes are idempotent under
//! retry: a re-run body repeats its lookups and finds whatever a competing
//! commit already created.

use std::sync::Arc;

use lockstep_foundation::{EntityId, Error, Result, Value};
use lockstep_storage::{Engine, EntityRecord, EntityStore, Transaction};

use crate::entities::{
    LIVE_OBJECT, LOCAL_ENTITY, LocalEntity, PROJECT_ID, SHARED_ENTITY, SHARED_REF, SharedEntity,
    is_stale, local_entity_schema,
};
use crate::project::{Project, ProjectId};

/// Stateless operations over the `SharedEntity` / `LocalEntity` pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityBridge;

impl IdentityBridge {
    /// Registers the bridge's entity types on a store snapshot.
    ///
    /// # Errors
    ///
    /// Returns a schema error if either type is already registered.
    pub fn install(store: &EntityStore) -> Result<EntityStore> {
        store
            .register(SharedEntity::schema())?
            .register(local_entity_schema())
    }

    /// Registers the bridge's entity types on an engine's committed state.
    ///
    /// # Errors
    ///
    /// Returns a schema error if either type is already registered.
    pub fn install_into(engine: &Engine) -> Result<()> {
        engine.register(SharedEntity::schema())?;
        engine.register(local_entity_schema())?;
        Ok(())
    }

    /// Binds a live project object, creating its shared and local entities
    /// as needed. Binding the same object again returns the same
    /// `LocalEntity`.
    ///
    /// # Errors
    ///
    /// - `InvariantViolation` if the object is already bound under a
    ///   different project ID, or lookups find duplicates
    /// - `ConstraintViolation` if another live object is already bound to
    ///   the same shared identity in this process
    /// - `NoActiveContext` if `tx` is no longer active
    pub fn bind<P: Project>(tx: &mut Transaction, project: &Arc<P>) -> Result<LocalEntity<P>> {
        let project_id = project.project_id();

        if let Some(local) = Self::local_of(tx, project)? {
            let shared = Self::shared_by_id(tx, local.shared)?;
            if shared.project_id != project_id {
                return Err(Error::invariant_violation(format!(
                    "{} is bound to {} and cannot be rebound to '{project_id}'",
                    project.describe(),
                    shared
                )));
            }
            return Ok(local);
        }

        let shared = Self::adopt_id(tx, &project_id)?;
        Self::prune_stale(tx, &shared)?;
        let id = tx.create(
            LOCAL_ENTITY,
            &[
                (SHARED_REF, Value::EntityRef(shared.id)),
                (LIVE_OBJECT, Value::live(project)),
            ],
        )?;
        tracing::debug!(project = %project_id, local = %id, shared = %shared.id, "bound project");

        Ok(LocalEntity {
            id,
            shared: shared.id,
            project: Arc::clone(project),
        })
    }

    /// Finds or creates the `SharedEntity` for a record received from
    /// another process.
    ///
    /// The returned entity's ID is the one in this store, which need not
    /// match the sender's.
    ///
    /// # Errors
    ///
    /// Returns any lookup or write error.
    pub fn adopt(tx: &mut Transaction, received: &SharedEntity) -> Result<SharedEntity> {
        Self::adopt_id(tx, &received.project_id)
    }

    fn adopt_id(tx: &mut Transaction, project_id: &ProjectId) -> Result<SharedEntity> {
        if let Some(shared) = Self::shared_for_id(tx, project_id)? {
            return Ok(shared);
        }
        let id = tx.create(SHARED_ENTITY, &[(PROJECT_ID, SharedEntity::key(project_id))])?;
        tracing::debug!(project = %project_id, shared = %id, "created shared entity");
        Ok(SharedEntity {
            id,
            project_id: project_id.clone(),
        })
    }

    /// Removes the binding of `shared` if its live object was dropped by the
    /// host, so a new object can take its place.
    fn prune_stale(tx: &mut Transaction, shared: &SharedEntity) -> Result<()> {
        let Some(id) = tx.single_or_null(LOCAL_ENTITY, SHARED_REF, &Value::EntityRef(shared.id))?
        else {
            return Ok(());
        };
        if is_stale(Self::record(tx, id)?) {
            tx.delete(id)?;
            tracing::debug!(local = %id, shared = %shared.id, "pruned stale binding");
        }
        Ok(())
    }

    /// Returns the `LocalEntity` wrapping `project`, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if more than one binding wraps the
    /// object, or `NoActiveContext` if `tx` is no longer active.
    pub fn local_of<P: Project>(
        tx: &Transaction,
        project: &Arc<P>,
    ) -> Result<Option<LocalEntity<P>>> {
        let Some(id) = tx.single_or_null(LOCAL_ENTITY, LIVE_OBJECT, &Value::live(project))? else {
            return Ok(None);
        };
        Self::record(tx, id).and_then(LocalEntity::from_record).map(Some)
    }

    /// Returns the `SharedEntity` for a project identifier, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` on duplicate identities, or
    /// `NoActiveContext` if `tx` is no longer active.
    pub fn shared_for_id(tx: &Transaction, project_id: &ProjectId) -> Result<Option<SharedEntity>> {
        let Some(id) = tx.single_or_null(SHARED_ENTITY, PROJECT_ID, &SharedEntity::key(project_id))?
        else {
            return Ok(None);
        };
        Self::shared_by_id(tx, id).map(Some)
    }

    /// Returns the `SharedEntity` bound to `project` in this process, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` on duplicate bindings, or
    /// `NoActiveContext` if `tx` is no longer active.
    pub fn shared_of_or_null<P: Project>(
        tx: &Transaction,
        project: &Arc<P>,
    ) -> Result<Option<SharedEntity>> {
        match Self::local_of(tx, project)? {
            Some(local) => Self::shared_by_id(tx, local.shared).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the `SharedEntity` bound to `project` in this process.
    ///
    /// # Errors
    ///
    /// Returns `NotBound` if the object has no binding, plus the errors of
    /// [`shared_of_or_null`](Self::shared_of_or_null).
    pub fn shared_of<P: Project>(tx: &Transaction, project: &Arc<P>) -> Result<SharedEntity> {
        Self::shared_of_or_null(tx, project)?.ok_or_else(|| Error::not_bound(project.describe()))
    }

    /// Returns the live object bound to `shared` in this process, if any.
    ///
    /// `shared` may come from another process, so it is matched by project
    /// ID; its EID is only trusted when the record there carries the same
    /// ID. Absent is the expected answer when the identity only lives in
    /// another process, after the shared entity was deleted, or after the
    /// host dropped the live object.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` on duplicate bindings, or
    /// `NoActiveContext` if `tx` is no longer active.
    pub fn project_of_or_null<P: Project>(
        tx: &Transaction,
        shared: &SharedEntity,
    ) -> Result<Option<Arc<P>>> {
        let Some(local_shared) = Self::resolve(tx, shared)? else {
            return Ok(None);
        };
        let Some(id) =
            tx.single_or_null(LOCAL_ENTITY, SHARED_REF, &Value::EntityRef(local_shared.id))?
        else {
            return Ok(None);
        };
        let record = Self::record(tx, id)?;
        if is_stale(record) {
            return Ok(None);
        }
        LocalEntity::<P>::from_record(record).map(|local| Some(local.project))
    }

    /// Returns the live object bound to `shared` in this process.
    ///
    /// # Errors
    ///
    /// Returns `NotBound` if this process has no binding, plus the errors of
    /// [`project_of_or_null`](Self::project_of_or_null).
    pub fn project_of<P: Project>(tx: &Transaction, shared: &SharedEntity) -> Result<Arc<P>> {
        Self::project_of_or_null(tx, shared)?.ok_or_else(|| Error::not_bound(shared.to_string()))
    }

    /// Returns true if `project` has a binding in this process.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if `tx` is no longer active.
    pub fn is_bound<P: Project>(tx: &Transaction, project: &Arc<P>) -> Result<bool> {
        Ok(!tx
            .find(LOCAL_ENTITY, LIVE_OBJECT, &Value::live(project))?
            .is_empty())
    }

    /// Removes the binding for a disposed live object. The `SharedEntity`
    /// is kept.
    ///
    /// Returns false if the object was not bound.
    ///
    /// # Errors
    ///
    /// Returns any lookup or write error.
    pub fn unbind<P: Project>(tx: &mut Transaction, project: &Arc<P>) -> Result<bool> {
        let Some(local) = Self::local_of(tx, project)? else {
            return Ok(false);
        };
        tx.delete(local.id)?;
        tracing::debug!(local = %local.id, "unbound project");
        Ok(true)
    }

    /// Deletes a project's `SharedEntity`, cascading to its `LocalEntity`.
    ///
    /// Returns every removed entity ID; empty if the project is unknown.
    ///
    /// # Errors
    ///
    /// Returns any lookup or write error.
    pub fn teardown(tx: &mut Transaction, project_id: &ProjectId) -> Result<Vec<EntityId>> {
        let Some(shared) = Self::shared_for_id(tx, project_id)? else {
            return Ok(Vec::new());
        };
        let removed = tx.delete(shared.id)?;
        tracing::debug!(project = %project_id, removed = removed.len(), "tore down project");
        Ok(removed)
    }

    /// Maps a possibly foreign `SharedEntity` to this store's record.
    fn resolve(tx: &Transaction, shared: &SharedEntity) -> Result<Option<SharedEntity>> {
        if let Some(record) = tx.get(shared.id)? {
            if record.is_a(SHARED_ENTITY) {
                let local = SharedEntity::from_record(record)?;
                if local.project_id == shared.project_id {
                    return Ok(Some(local));
                }
            }
        }
        Self::shared_for_id(tx, &shared.project_id)
    }

    fn shared_by_id(tx: &Transaction, id: EntityId) -> Result<SharedEntity> {
        Self::record(tx, id).and_then(SharedEntity::from_record)
    }

    fn record(tx: &Transaction, id: EntityId) -> Result<&EntityRecord> {
        tx.get(id)?.ok_or_else(|| Error::entity_not_found(id))
    }
}
