//! Serialization boundary for replicated records.
//!
//! Only `SharedEntity` records cross process boundaries. They are encoded as
//! MessagePack with named fields and wrapped in a [`WireRecord`] that names
//! the entity type, so the receiver can pick a decoder without trusting the
//! payload. The transport itself is up to the host.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lockstep_foundation::{Error, ErrorKind, Result, SchemaError};
use lockstep_storage::EntityStore;

use crate::entities::{SHARED_ENTITY, SharedEntity};

/// A replicated record tagged with its entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    /// Entity type name, used to select a decoder.
    pub entity_type: String,
    /// MessagePack-encoded record.
    pub payload: Vec<u8>,
}

impl WireRecord {
    /// Encodes the wire record itself for transport.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(serialization)
    }

    /// Decodes a wire record received from transport.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the bytes are malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(serialization)
    }
}

/// A decoded replicated record. One variant per replicated entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicatedRecord {
    /// A distributable project identity.
    Shared(SharedEntity),
}

impl ReplicatedRecord {
    /// Returns the entity type name.
    #[must_use]
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::Shared(_) => SHARED_ENTITY,
        }
    }

    /// Encodes the record for transport.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn encode(&self) -> Result<WireRecord> {
        match self {
            Self::Shared(shared) => encode_shared(shared),
        }
    }
}

/// Encodes a `SharedEntity` for transport.
///
/// # Errors
///
/// Returns a serialization error if encoding fails.
pub fn encode_shared(shared: &SharedEntity) -> Result<WireRecord> {
    Ok(WireRecord {
        entity_type: SHARED_ENTITY.to_string(),
        payload: rmp_serde::to_vec_named(shared).map_err(serialization)?,
    })
}

fn decode_shared(payload: &[u8]) -> Result<ReplicatedRecord> {
    rmp_serde::from_slice(payload)
        .map(ReplicatedRecord::Shared)
        .map_err(serialization)
}

/// Decodes one entity type's payload.
pub type Decoder = fn(&[u8]) -> Result<ReplicatedRecord>;

/// Maps entity type names to decoders.
///
/// The default registry knows `SharedEntity`. Names without a decoder are
/// rejected, so a process never materializes a type it did not declare as
/// replicated.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<Arc<str>, Decoder>,
}

impl DecoderRegistry {
    /// Creates a registry with no decoders.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers a decoder for an entity type.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the type already has a decoder.
    pub fn register(&mut self, entity_type: impl Into<Arc<str>>, decoder: Decoder) -> Result<()> {
        let entity_type = entity_type.into();
        if self.decoders.contains_key(&entity_type) {
            return Err(Error::schema(SchemaError::DuplicateEntityType(
                entity_type.to_string(),
            )));
        }
        self.decoders.insert(entity_type, decoder);
        Ok(())
    }

    /// Returns true if the type has a decoder.
    #[must_use]
    pub fn contains(&self, entity_type: &str) -> bool {
        self.decoders.contains_key(entity_type)
    }

    /// Decodes a payload of the named type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if no decoder is registered, or a
    /// serialization error if the payload is malformed.
    pub fn decode_payload(&self, entity_type: &str, payload: &[u8]) -> Result<ReplicatedRecord> {
        let decoder = self
            .decoders
            .get(entity_type)
            .ok_or_else(|| Error::new(ErrorKind::UnknownEntityType(entity_type.to_string())))?;
        decoder(payload)
    }

    /// Decodes a wire record.
    ///
    /// # Errors
    ///
    /// As [`decode_payload`](Self::decode_payload).
    pub fn decode(&self, record: &WireRecord) -> Result<ReplicatedRecord> {
        self.decode_payload(&record.entity_type, &record.payload)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut decoders: HashMap<Arc<str>, Decoder> = HashMap::new();
        decoders.insert(Arc::from(SHARED_ENTITY), decode_shared);
        Self { decoders }
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.decoders.keys().map(|k| &**k).collect();
        names.sort_unstable();
        f.debug_struct("DecoderRegistry")
            .field("entity_types", &names)
            .finish()
    }
}

/// Encodes every replicated record in a snapshot.
///
/// Records of local types and transient values are never encoded.
///
/// # Errors
///
/// Returns a serialization error if a record cannot be encoded.
pub fn export_replicated(store: &EntityStore) -> Result<Vec<WireRecord>> {
    let replicated = store
        .schema()
        .get(SHARED_ENTITY)
        .is_some_and(lockstep_storage::EntityTypeSchema::is_replicated);
    if !replicated {
        return Ok(Vec::new());
    }

    let mut records = store
        .entities_of(SHARED_ENTITY)
        .map(SharedEntity::from_record)
        .collect::<Result<Vec<_>>>()?;
    records.sort_by_key(|shared| shared.id);

    let wire = records
        .iter()
        .map(encode_shared)
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(records = wire.len(), "exported replicated records");
    Ok(wire)
}

#[allow(clippy::needless_pass_by_value)]
fn serialization(err: impl fmt::Display) -> Error {
    Error::new(ErrorKind::Serialization(err.to_string()))
}
