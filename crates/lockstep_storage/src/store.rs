//! Entity store snapshots.
//!
//! The `EntityStore` is the unified interface to records, schemas, and
//! indices. It uses persistent data structures for O(1) cloning and
//! structural sharing; every mutation returns a new snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use lockstep_foundation::{
    EntityId, Error, ErrorContext, ErrorKind, LtMap, Result, Type, Value,
};

use crate::entity::EidAllocator;
use crate::index::AttributeIndex;
use crate::query::Matches;
use crate::schema::{AttributeKind, AttributeSchema, EntityTypeSchema, SchemaRegistry};

/// A stored entity: its type and one value per declared attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRecord {
    /// The entity's ID.
    pub id: EntityId,
    /// Name of the entity's type.
    pub entity_type: Arc<str>,
    /// Attribute values by name.
    pub attributes: LtMap<Arc<str>, Value>,
}

impl EntityRecord {
    /// Returns the value of an attribute.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Returns true if the record is of the named type.
    #[must_use]
    pub fn is_a(&self, entity_type: &str) -> bool {
        &*self.entity_type == entity_type
    }
}

/// Immutable snapshot of every live entity.
///
/// Clone is O(1) due to structural sharing. All mutation methods return a new
/// `EntityStore`; the receiver is never modified, so a failed operation leaves
/// it exactly as it was.
#[derive(Clone, Debug)]
pub struct EntityStore {
    schema: Arc<SchemaRegistry>,
    records: LtMap<EntityId, EntityRecord>,
    index: AttributeIndex,
    allocator: EidAllocator,
}

impl EntityStore {
    /// Creates an empty store with no registered types.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: Arc::new(SchemaRegistry::new()),
            records: LtMap::new(),
            index: AttributeIndex::new(),
            allocator: EidAllocator::new(),
        }
    }

    // --- Schema ---

    /// Registers an entity type.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the registry rejects the declaration.
    pub fn register(&self, schema: EntityTypeSchema) -> Result<EntityStore> {
        let mut registry = (*self.schema).clone();
        registry.register(schema)?;
        Ok(EntityStore {
            schema: Arc::new(registry),
            ..self.clone()
        })
    }

    /// Returns the schema registry.
    #[must_use]
    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    // --- Writes ---

    /// Creates an entity with a freshly allocated ID.
    ///
    /// The ID is only allocated once every check has passed.
    ///
    /// # Errors
    ///
    /// - `UnknownEntityType` if the type is not registered
    /// - `UnknownAttribute` if an attribute is not declared on the type
    /// - `ConstraintViolation` if an attribute is supplied twice, a unique
    ///   value is already taken, or a reference points at the wrong type
    /// - `TypeMismatch` if a value does not fit its declaration
    /// - `EntityNotFound` if a reference points at a missing entity
    /// - `MissingAttribute` if a declared attribute is not supplied
    pub fn create(
        &self,
        entity_type: &str,
        attributes: &[(&str, Value)],
    ) -> Result<(EntityStore, EntityId)> {
        let (entity_type, values) = self.validate(entity_type, attributes)?;
        let id = self.allocator.allocate();
        tracing::debug!(entity = %id, entity_type = %entity_type, "created entity");
        Ok((self.insert_validated(id, entity_type, values), id))
    }

    /// Creates an entity under an ID allocated earlier from this store.
    ///
    /// Used to replay a transaction's writes onto a newer snapshot.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create), plus `ConstraintViolation` if the ID is
    /// already live.
    pub fn insert_with_id(
        &self,
        id: EntityId,
        entity_type: &str,
        attributes: &[(&str, Value)],
    ) -> Result<EntityStore> {
        if self.records.contains_key(&id) {
            return Err(Error::constraint_violation(format!(
                "{id} is already present"
            )));
        }
        let (entity_type, values) = self.validate(entity_type, attributes)?;
        Ok(self.insert_validated(id, entity_type, values))
    }

    /// Deletes an entity and, recursively, every entity that holds a
    /// cascade-delete reference to it.
    ///
    /// Returns the new snapshot and the removed IDs in removal order:
    /// dependents always come before the entities they reference, so `id`
    /// itself is last.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if `id` is not live
    /// - `ConstraintViolation` if an entity outside the cascade still holds a
    ///   plain reference to one of the removed entities
    pub fn delete(&self, id: EntityId) -> Result<(EntityStore, Vec<EntityId>)> {
        if !self.records.contains_key(&id) {
            return Err(Error::entity_not_found(id));
        }

        let order = self.cascade_order(id);
        let doomed: HashSet<EntityId> = order.iter().copied().collect();
        self.check_restricted(&order, &doomed)?;

        let mut records = self.records.clone();
        let mut index = self.index.clone();
        for victim in &order {
            if let Some(record) = self.records.get(victim) {
                for (attribute, value) in self.indexed_values(record) {
                    index = index.remove(&record.entity_type, attribute, value, *victim);
                }
                records = records.remove(victim);
            }
        }

        if order.len() > 1 {
            tracing::debug!(entity = %id, cascaded = order.len() - 1, "cascade delete");
        }
        tracing::debug!(entity = %id, "deleted entity");

        Ok((
            EntityStore {
                records,
                index,
                ..self.clone()
            },
            order,
        ))
    }

    // --- Queries ---

    /// Finds entities whose indexed attribute equals `value`.
    ///
    /// # Errors
    ///
    /// - `UnknownEntityType` / `UnknownAttribute` for undeclared names
    /// - `NotIndexed` if the attribute has no index
    pub fn find(&self, entity_type: &str, attribute: &str, value: &Value) -> Result<Matches> {
        let schema = self.entity_schema(entity_type)?;
        let declared = Self::attribute_schema(schema, attribute)?;
        if !declared.is_indexed() {
            return Err(Error::new(ErrorKind::NotIndexed {
                entity_type: entity_type.to_string(),
                attribute: attribute.to_string(),
            }));
        }

        let ids = self.index.get(&schema.name, &declared.name, value);
        tracing::trace!(entity_type, attribute, matches = ids.len(), "index lookup");
        Ok(Matches::new(
            Arc::clone(&schema.name),
            Arc::clone(&declared.name),
            value.clone(),
            ids,
        ))
    }

    /// Returns the single entity matching an indexed lookup, if any.
    ///
    /// # Errors
    ///
    /// As [`find`](Self::find), plus `InvariantViolation` if more than one
    /// entity matches.
    pub fn single_or_null(
        &self,
        entity_type: &str,
        attribute: &str,
        value: &Value,
    ) -> Result<Option<EntityId>> {
        self.find(entity_type, attribute, value)?.single()
    }

    // --- Accessors ---

    /// Returns an entity's record.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.records.get(&id)
    }

    /// Returns one attribute of an entity.
    #[must_use]
    pub fn attribute(&self, id: EntityId, attribute: &str) -> Option<&Value> {
        self.records.get(&id).and_then(|record| record.get(attribute))
    }

    /// Checks if an entity is live.
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no entities are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates all live entity IDs.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.records.keys().copied()
    }

    /// Iterates the records of one entity type.
    pub fn entities_of<'a>(
        &'a self,
        entity_type: &'a str,
    ) -> impl Iterator<Item = &'a EntityRecord> + 'a {
        self.records
            .values()
            .filter(move |record| record.is_a(entity_type))
    }

    /// Returns the number of distinct values held in indices.
    #[must_use]
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    // --- Internals ---

    fn entity_schema(&self, entity_type: &str) -> Result<&EntityTypeSchema> {
        self.schema
            .get(entity_type)
            .ok_or_else(|| Error::new(ErrorKind::UnknownEntityType(entity_type.to_string())))
    }

    fn attribute_schema<'s>(
        schema: &'s EntityTypeSchema,
        attribute: &str,
    ) -> Result<&'s AttributeSchema> {
        schema.attribute(attribute).ok_or_else(|| {
            Error::new(ErrorKind::UnknownAttribute {
                entity_type: schema.name.to_string(),
                attribute: attribute.to_string(),
            })
        })
    }

    /// Checks a write against the schema and current snapshot.
    fn validate(
        &self,
        entity_type: &str,
        attributes: &[(&str, Value)],
    ) -> Result<(Arc<str>, LtMap<Arc<str>, Value>)> {
        let schema = self.entity_schema(entity_type)?;

        let mut values: LtMap<Arc<str>, Value> = LtMap::new();
        for (name, value) in attributes {
            let declared = Self::attribute_schema(schema, name)?;
            if values.contains_key(*name) {
                return Err(Error::constraint_violation(format!(
                    "attribute {name} supplied more than once"
                ))
                .with_context(context(schema, declared)));
            }
            self.check_value(schema, declared, value)?;
            values = values.insert(Arc::clone(&declared.name), value.clone());
        }

        for declared in &schema.attributes {
            let Some(value) = values.get(&*declared.name) else {
                return Err(Error::new(ErrorKind::MissingAttribute {
                    entity_type: schema.name.to_string(),
                    attribute: declared.name.to_string(),
                }));
            };
            if declared.unique && self.index.contains(&schema.name, &declared.name, value) {
                return Err(Error::constraint_violation(format!(
                    "{}.{} = {value} is already taken",
                    schema.name, declared.name
                ))
                .with_context(context(schema, declared)));
            }
        }

        Ok((Arc::clone(&schema.name), values))
    }

    fn check_value(
        &self,
        schema: &EntityTypeSchema,
        declared: &AttributeSchema,
        value: &Value,
    ) -> Result<()> {
        let mismatch = |expected: Type| {
            Error::type_mismatch(expected, value.value_type())
                .with_context(context(schema, declared))
        };

        match &declared.kind {
            AttributeKind::Value(ty) => {
                if !ty.accepts(value.value_type()) {
                    return Err(mismatch(*ty));
                }
            }
            AttributeKind::Transient => {
                if value.as_live().is_none() {
                    return Err(mismatch(Type::Live));
                }
            }
            AttributeKind::Reference { target } => {
                let id = value.as_entity().ok_or_else(|| mismatch(Type::EntityRef))?;
                let referenced = self.records.get(&id).ok_or_else(|| {
                    Error::entity_not_found(id).with_context(context(schema, declared))
                })?;
                if referenced.entity_type != *target {
                    return Err(Error::constraint_violation(format!(
                        "{}.{} must reference {target}, got {id} of type {}",
                        schema.name, declared.name, referenced.entity_type
                    ))
                    .with_context(context(schema, declared)));
                }
            }
        }
        Ok(())
    }

    fn insert_validated(
        &self,
        id: EntityId,
        entity_type: Arc<str>,
        attributes: LtMap<Arc<str>, Value>,
    ) -> EntityStore {
        let record = EntityRecord {
            id,
            entity_type,
            attributes,
        };

        let mut index = self.index.clone();
        for (attribute, value) in self.indexed_values(&record) {
            index = index.insert(&record.entity_type, attribute, value, id);
        }

        EntityStore {
            records: self.records.insert(id, record),
            index,
            ..self.clone()
        }
    }

    /// Pairs each indexed attribute of `record`'s type with its value.
    fn indexed_values<'a>(
        &'a self,
        record: &'a EntityRecord,
    ) -> impl Iterator<Item = (&'a Arc<str>, &'a Value)> + 'a {
        self.schema
            .get(&record.entity_type)
            .into_iter()
            .flat_map(|schema| schema.attributes.iter())
            .filter(|declared| declared.is_indexed())
            .filter_map(move |declared| {
                record
                    .get(&declared.name)
                    .map(|value| (&declared.name, value))
            })
    }

    /// Entities holding a reference to `target`, filtered by cascade flag.
    fn referrers(&self, target: EntityId, cascade: bool) -> Vec<(EntityId, Arc<str>)> {
        let Some(record) = self.records.get(&target) else {
            return Vec::new();
        };
        let probe = Value::EntityRef(target);
        self.schema
            .incoming_references(&record.entity_type)
            .iter()
            .filter(|edge| edge.cascade == cascade)
            .flat_map(|edge| {
                self.index
                    .get(&edge.owner, &edge.attribute, &probe)
                    .into_iter()
                    .map(move |owner| (owner, Arc::clone(&edge.attribute)))
            })
            .collect()
    }

    /// Post-order walk of the cascade graph below `root`.
    fn cascade_order(&self, root: EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut worklist = vec![(root, false)];

        while let Some((id, expanded)) = worklist.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            worklist.push((id, true));
            for (dependent, _) in self.referrers(id, true) {
                if !visited.contains(&dependent) {
                    worklist.push((dependent, false));
                }
            }
        }
        order
    }

    fn check_restricted(&self, order: &[EntityId], doomed: &HashSet<EntityId>) -> Result<()> {
        for victim in order {
            if let Some((owner, attribute)) = self
                .referrers(*victim, false)
                .into_iter()
                .find(|(owner, _)| !doomed.contains(owner))
            {
                return Err(Error::constraint_violation(format!(
                    "cannot delete {victim}: still referenced by {owner} via {attribute}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

fn context(schema: &EntityTypeSchema, declared: &AttributeSchema) -> ErrorContext {
    ErrorContext::new()
        .with_entity_type(&*schema.name)
        .with_attribute(&*declared.name)
}
