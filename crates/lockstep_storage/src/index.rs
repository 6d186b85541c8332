//! Attribute indices.
//!
//! One persistent map serves every indexed attribute: unique values,
//! non-unique indexed values, and reference targets. A reference index entry
//! is keyed by the target's `EntityRef`, so "which owners point at X" is the
//! same O(1) probe as "which entities have projectId = X".

use std::sync::Arc;

use lockstep_foundation::{EntityId, LtMap, LtSet, Value};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct IndexKey {
    entity_type: Arc<str>,
    attribute: Arc<str>,
    value: Value,
}

impl IndexKey {
    fn new(entity_type: &Arc<str>, attribute: &Arc<str>, value: &Value) -> Self {
        Self {
            entity_type: Arc::clone(entity_type),
            attribute: Arc::clone(attribute),
            value: value.clone(),
        }
    }
}

/// Persistent value -> entities index.
///
/// Cloning is O(1); every update returns a new index sharing structure with
/// the old one.
#[derive(Clone, Debug, Default)]
pub struct AttributeIndex {
    entries: LtMap<IndexKey, LtSet<EntityId>>,
}

impl AttributeIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new index with `entity` recorded under the given value.
    #[must_use]
    pub fn insert(
        &self,
        entity_type: &Arc<str>,
        attribute: &Arc<str>,
        value: &Value,
        entity: EntityId,
    ) -> Self {
        let key = IndexKey::new(entity_type, attribute, value);
        Self {
            entries: self.entries.alter(key, |existing| {
                Some(existing.map_or_else(LtSet::new, Clone::clone).insert(entity))
            }),
        }
    }

    /// Returns a new index with `entity` removed from the given value.
    ///
    /// Empty entries are dropped so the index never holds stale keys.
    #[must_use]
    pub fn remove(
        &self,
        entity_type: &Arc<str>,
        attribute: &Arc<str>,
        value: &Value,
        entity: EntityId,
    ) -> Self {
        let key = IndexKey::new(entity_type, attribute, value);
        Self {
            entries: self.entries.alter(key, |existing| {
                existing
                    .map(|set| set.remove(&entity))
                    .filter(|set| !set.is_empty())
            }),
        }
    }

    /// Returns the entities recorded under the given value.
    #[must_use]
    pub fn get(&self, entity_type: &Arc<str>, attribute: &Arc<str>, value: &Value) -> LtSet<EntityId> {
        self.entries
            .get(&IndexKey::new(entity_type, attribute, value))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns true if any entity is recorded under the given value.
    #[must_use]
    pub fn contains(&self, entity_type: &Arc<str>, attribute: &Arc<str>, value: &Value) -> bool {
        self.entries
            .contains_key(&IndexKey::new(entity_type, attribute, value))
    }

    /// Returns the number of distinct indexed values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
