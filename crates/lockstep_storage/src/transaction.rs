//! Optimistic transactions over entity store snapshots.
//!
//! A [`Transaction`] works on a private copy of the committed snapshot and
//! logs every write. [`Engine::commit`] installs the copy directly when
//! nothing else committed in the meantime; otherwise it replays the log on
//! top of the newer snapshot, re-running every constraint check. A write that
//! no longer applies turns into a commit conflict, and
//! [`Engine::with_transaction`] re-runs the whole body.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use lockstep_foundation::{EntityId, Error, ErrorKind, Result, Value};

use crate::config::EngineConfig;
use crate::query::Matches;
use crate::schema::EntityTypeSchema;
use crate::store::{EntityRecord, EntityStore};

/// A write recorded by a transaction, in the order it was made.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// An entity was created under a pre-allocated ID.
    Create {
        /// The allocated ID.
        id: EntityId,
        /// Entity type name.
        entity_type: Arc<str>,
        /// Supplied attribute values.
        attributes: Vec<(Arc<str>, Value)>,
    },
    /// An entity was deleted, with its cascade.
    Delete(EntityId),
}

impl WriteOp {
    fn apply(&self, store: &EntityStore) -> Result<EntityStore> {
        match self {
            Self::Create {
                id,
                entity_type,
                attributes,
            } => {
                let attributes: Vec<(&str, Value)> = attributes
                    .iter()
                    .map(|(name, value)| (&**name, value.clone()))
                    .collect();
                store.insert_with_id(*id, entity_type, &attributes)
            }
            Self::Delete(id) => store.delete(*id).map(|(store, _)| store),
        }
    }
}

/// Lifecycle state of a transaction handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Reads and writes are allowed.
    Active,
    /// The transaction's writes are part of the committed state.
    Committed,
    /// The transaction was abandoned; none of its writes took effect.
    RolledBack,
}

/// A unit of work against one consistent snapshot.
///
/// Every operation first checks that the handle is still active; once it has
/// been committed or rolled back, operations fail with `NoActiveContext`.
#[derive(Debug)]
pub struct Transaction {
    id: u64,
    base_version: u64,
    store: EntityStore,
    log: Vec<WriteOp>,
    status: TransactionStatus,
}

impl Transaction {
    /// Returns the transaction's ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the committed version this transaction started from.
    #[must_use]
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Returns the transaction's status.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns true if the handle may still be used.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Returns the writes made so far.
    #[must_use]
    pub fn writes(&self) -> &[WriteOp] {
        &self.log
    }

    /// Fails unless the handle is active.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` after commit or rollback.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::no_active_context())
        }
    }

    /// Returns the working snapshot, including this transaction's writes.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if the handle is no longer active.
    pub fn store(&self) -> Result<&EntityStore> {
        self.ensure_active()?;
        Ok(&self.store)
    }

    /// Creates an entity. See [`EntityStore::create`].
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if the handle is no longer active, or any
    /// error from the store.
    pub fn create(&mut self, entity_type: &str, attributes: &[(&str, Value)]) -> Result<EntityId> {
        self.ensure_active()?;
        let (store, id) = self.store.create(entity_type, attributes)?;
        self.store = store;
        self.log.push(WriteOp::Create {
            id,
            entity_type: Arc::from(entity_type),
            attributes: attributes
                .iter()
                .map(|(name, value)| (Arc::from(*name), value.clone()))
                .collect(),
        });
        Ok(id)
    }

    /// Deletes an entity with its cascade. See [`EntityStore::delete`].
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if the handle is no longer active, or any
    /// error from the store.
    pub fn delete(&mut self, id: EntityId) -> Result<Vec<EntityId>> {
        self.ensure_active()?;
        let (store, removed) = self.store.delete(id)?;
        self.store = store;
        self.log.push(WriteOp::Delete(id));
        Ok(removed)
    }

    /// Indexed lookup. See [`EntityStore::find`].
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if the handle is no longer active, or any
    /// error from the store.
    pub fn find(&self, entity_type: &str, attribute: &str, value: &Value) -> Result<Matches> {
        self.store()?.find(entity_type, attribute, value)
    }

    /// Single-match lookup. See [`EntityStore::single_or_null`].
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if the handle is no longer active, or any
    /// error from the store.
    pub fn single_or_null(
        &self,
        entity_type: &str,
        attribute: &str,
        value: &Value,
    ) -> Result<Option<EntityId>> {
        self.store()?.single_or_null(entity_type, attribute, value)
    }

    /// Returns an entity's record.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if the handle is no longer active.
    pub fn get(&self, id: EntityId) -> Result<Option<&EntityRecord>> {
        Ok(self.store()?.get(id))
    }

    /// Returns one attribute of an entity.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if the handle is no longer active.
    pub fn attribute(&self, id: EntityId, attribute: &str) -> Result<Option<&Value>> {
        Ok(self.store()?.attribute(id, attribute))
    }

    /// Checks if an entity is live in the working snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveContext` if the handle is no longer active.
    pub fn exists(&self, id: EntityId) -> Result<bool> {
        Ok(self.store()?.exists(id))
    }

    /// Abandons the transaction. Idempotent.
    pub fn rollback(&mut self) {
        if self.is_active() {
            tracing::debug!(txn = self.id, writes = self.log.len(), "rolled back");
            self.status = TransactionStatus::RolledBack;
            self.log.clear();
        }
    }
}

#[derive(Debug)]
struct Committed {
    store: EntityStore,
    version: u64,
}

/// Holds the committed snapshot and serializes commits.
///
/// Readers never block each other; a commit holds the write lock only while
/// it installs or replays a transaction's writes.
#[derive(Debug)]
pub struct Engine {
    state: RwLock<Committed>,
    next_txn: AtomicU64,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine over `store` with the default configuration.
    #[must_use]
    pub fn new(store: EntityStore) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Creates an engine over `store` with the given configuration.
    #[must_use]
    pub fn with_config(store: EntityStore, config: EngineConfig) -> Self {
        Self {
            state: RwLock::new(Committed { store, version: 0 }),
            next_txn: AtomicU64::new(1),
            config,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the current committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> EntityStore {
        self.state.read().store.clone()
    }

    /// Returns the current committed version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Registers an entity type on the committed snapshot.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the declaration is rejected.
    pub fn register(&self, schema: EntityTypeSchema) -> Result<u64> {
        let mut state = self.state.write();
        state.store = state.store.register(schema)?;
        state.version += 1;
        Ok(state.version)
    }

    /// Starts a transaction on the current committed snapshot.
    #[must_use]
    pub fn begin(&self) -> Transaction {
        let state = self.state.read();
        let id = self.next_txn.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(txn = id, version = state.version, "begin");
        Transaction {
            id,
            base_version: state.version,
            store: state.store.clone(),
            log: Vec::new(),
            status: TransactionStatus::Active,
        }
    }

    /// Commits a transaction and returns the resulting version.
    ///
    /// A read-only transaction commits without creating a new version.
    ///
    /// # Errors
    ///
    /// - `NoActiveContext` if the handle is no longer active
    /// - `CommitConflict` if the writes no longer apply to the newer
    ///   committed snapshot; the engine is left unchanged and the handle is
    ///   rolled back
    pub fn commit(&self, tx: &mut Transaction) -> Result<u64> {
        tx.ensure_active()?;
        let mut state = self.state.write();

        if tx.log.is_empty() {
            tx.status = TransactionStatus::Committed;
            return Ok(state.version);
        }

        let store = if state.version == tx.base_version {
            tx.store.clone()
        } else {
            match Self::replay(&state.store, &tx.log) {
                Ok(store) => store,
                Err(cause) => {
                    let version = state.version;
                    drop(state);
                    if self.config.log_conflicts {
                        tracing::warn!(txn = tx.id, base = tx.base_version, version, %cause, "commit conflict");
                    } else {
                        tracing::debug!(txn = tx.id, base = tx.base_version, version, %cause, "commit conflict");
                    }
                    tx.rollback();
                    return Err(Error::new(ErrorKind::CommitConflict(format!(
                        "transaction {} started at version {} does not apply at version {version}: {cause}",
                        tx.id, tx.base_version
                    ))));
                }
            }
        };

        state.store = store;
        state.version += 1;
        tracing::debug!(txn = tx.id, version = state.version, writes = tx.log.len(), "committed");
        tx.status = TransactionStatus::Committed;
        Ok(state.version)
    }

    fn replay(base: &EntityStore, log: &[WriteOp]) -> Result<EntityStore> {
        log.iter().try_fold(base.clone(), |store, op| op.apply(&store))
    }

    /// Runs `body` in a transaction and commits it.
    ///
    /// On a commit conflict the body is re-run against a fresh snapshot, up to
    /// [`EngineConfig::max_commit_retries`] times. An error returned by the
    /// body rolls the transaction back and is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns the body's error, or the last `CommitConflict` once retries are
    /// exhausted.
    pub fn with_transaction<T, F>(&self, mut body: F) -> Result<T>
    where
        F: FnMut(&mut Transaction) -> Result<T>,
    {
        let mut retries = 0;
        loop {
            let mut tx = self.begin();
            let value = match body(&mut tx) {
                Ok(value) => value,
                Err(err) => {
                    tx.rollback();
                    return Err(err);
                }
            };

            match self.commit(&mut tx) {
                Ok(_) => return Ok(value),
                Err(err) if err.is_retryable() && retries < self.config.max_commit_retries => {
                    retries += 1;
                    tracing::debug!(txn = tx.id, retries, "retrying transaction");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EntityStore::new())
    }
}
