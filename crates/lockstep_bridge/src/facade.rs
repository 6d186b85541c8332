//! Lookup and conversion operations exposed to the host application.

use std::sync::Arc;

use lockstep_foundation::{Error, Result};
use lockstep_storage::Transaction;

use crate::bridge::IdentityBridge;
use crate::entities::{LocalEntity, SharedEntity};
use crate::project::Project;

/// Read-only conversions between live projects and their entities.
///
/// Strict variants fail with `NotFound`, naming the queried object;
/// `_or_null` variants return `None`. The facade holds no state beyond the
/// transaction it reads from.
#[derive(Clone, Copy, Debug)]
pub struct QueryFacade<'a> {
    tx: &'a Transaction,
}

impl<'a> QueryFacade<'a> {
    /// Creates a facade over a transaction.
    #[must_use]
    pub fn new(tx: &'a Transaction) -> Self {
        Self { tx }
    }

    /// Returns the `SharedEntity` of a bound project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project is not bound in this process.
    pub fn to_shared_entity<P: Project>(self, project: &Arc<P>) -> Result<SharedEntity> {
        self.to_shared_entity_or_null(project)?
            .ok_or_else(|| Error::not_found(format!("no shared entity for {}", project.describe())))
    }

    /// Returns the `SharedEntity` of a bound project, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` on duplicate bindings, or
    /// `NoActiveContext` if the transaction is no longer active.
    pub fn to_shared_entity_or_null<P: Project>(
        self,
        project: &Arc<P>,
    ) -> Result<Option<SharedEntity>> {
        IdentityBridge::shared_of_or_null(self.tx, project)
    }

    /// Returns the `LocalEntity` wrapping a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project is not bound in this process.
    pub fn to_local_entity<P: Project>(self, project: &Arc<P>) -> Result<LocalEntity<P>> {
        self.to_local_entity_or_null(project)?
            .ok_or_else(|| Error::not_found(format!("no local entity for {}", project.describe())))
    }

    /// Returns the `LocalEntity` wrapping a project, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` on duplicate bindings, or
    /// `NoActiveContext` if the transaction is no longer active.
    pub fn to_local_entity_or_null<P: Project>(
        self,
        project: &Arc<P>,
    ) -> Result<Option<LocalEntity<P>>> {
        IdentityBridge::local_of(self.tx, project)
    }

    /// Returns the live project bound to a `SharedEntity` in this process.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if this process has no binding for it.
    pub fn to_live_object<P: Project>(self, shared: &SharedEntity) -> Result<Arc<P>> {
        self.to_live_object_or_null(shared)?
            .ok_or_else(|| Error::not_found(format!("no live object for {shared}")))
    }

    /// Returns the live project bound to a `SharedEntity`, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` on duplicate bindings, or
    /// `NoActiveContext` if the transaction is no longer active.
    pub fn to_live_object_or_null<P: Project>(
        self,
        shared: &SharedEntity,
    ) -> Result<Option<Arc<P>>> {
        IdentityBridge::project_of_or_null(self.tx, shared)
    }

    /// Returns true if the project is bound in this process.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if the transaction is no longer active.
    pub fn is_bound<P: Project>(self, project: &Arc<P>) -> Result<bool> {
        IdentityBridge::is_bound(self.tx, project)
    }
}
