//! Schema definitions for entity types and their attributes.
//!
//! Schemas are declared up front and registered before any instance of the
//! type is created. A registered schema is immutable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lockstep_foundation::{Error, Result, SchemaError, Type};

/// What an attribute holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    /// A serializable scalar of the given type.
    Value(Type),
    /// A reference to an entity of the named type.
    Reference {
        /// Name of the referenced entity type.
        target: Arc<str>,
    },
    /// A process-local object that is never replicated.
    Transient,
}

impl AttributeKind {
    /// Returns the value type stored for this kind.
    #[must_use]
    pub fn value_type(&self) -> Type {
        match self {
            Self::Value(ty) => *ty,
            Self::Reference { .. } => Type::EntityRef,
            Self::Transient => Type::Live,
        }
    }
}

/// Schema definition for a single attribute.
///
/// All attributes are required: every entity of the declaring type carries a
/// value for each of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSchema {
    /// Attribute name (e.g., `projectId`).
    pub name: Arc<str>,
    /// What the attribute holds.
    pub kind: AttributeKind,
    /// At most one live entity of the type may hold a given value.
    pub unique: bool,
    /// Maintain a value index for lookups without uniqueness.
    pub indexed: bool,
    /// Deleting the referenced entity deletes the declaring entity too.
    pub cascade_delete_by: bool,
}

impl AttributeSchema {
    fn with_kind(name: impl Into<Arc<str>>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            unique: false,
            indexed: false,
            cascade_delete_by: false,
        }
    }

    /// Creates a required value attribute.
    #[must_use]
    pub fn value(name: impl Into<Arc<str>>, ty: Type) -> Self {
        Self::with_kind(name, AttributeKind::Value(ty))
    }

    /// Creates a required reference attribute.
    #[must_use]
    pub fn reference(name: impl Into<Arc<str>>, target: impl Into<Arc<str>>) -> Self {
        Self::with_kind(
            name,
            AttributeKind::Reference {
                target: target.into(),
            },
        )
    }

    /// Creates a required transient attribute.
    #[must_use]
    pub fn transient(name: impl Into<Arc<str>>) -> Self {
        Self::with_kind(name, AttributeKind::Transient)
    }

    /// Declares a unique index on this attribute.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declares a non-unique index on this attribute.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Declares that deleting the referenced entity deletes this one.
    #[must_use]
    pub fn cascade_delete_by(mut self) -> Self {
        self.cascade_delete_by = true;
        self
    }

    /// Returns true if lookups by this attribute are served from an index.
    ///
    /// Reference attributes are always indexed so that owners can be found
    /// from their targets.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.unique || self.indexed || self.reference_target().is_some()
    }

    /// Returns the referenced type name for reference attributes.
    #[must_use]
    pub fn reference_target(&self) -> Option<&Arc<str>> {
        match &self.kind {
            AttributeKind::Reference { target } => Some(target),
            _ => None,
        }
    }
}

/// Schema definition for an entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityTypeSchema {
    /// Globally unique type name.
    pub name: Arc<str>,
    /// Attribute declarations, in declaration order.
    pub attributes: Vec<AttributeSchema>,
    /// If true, entities of this type never leave the process.
    pub local: bool,
}

impl EntityTypeSchema {
    /// Creates a new entity type schema with no attributes.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            local: false,
        }
    }

    /// Adds an attribute to the schema.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeSchema) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Marks the type as process-local.
    #[must_use]
    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    /// Returns the attribute schema by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| &*a.name == name)
    }

    /// Returns true if records of this type may be replicated to other processes.
    #[must_use]
    pub fn is_replicated(&self) -> bool {
        !self.local
            && self
                .attributes
                .iter()
                .all(|a| a.kind.value_type().is_serializable())
    }
}

/// An incoming reference edge: `owner.attribute` points at some target type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceEdge {
    /// Entity type declaring the reference.
    pub owner: Arc<str>,
    /// Reference attribute on the owner.
    pub attribute: Arc<str>,
    /// Whether deleting the target deletes the owner.
    pub cascade: bool,
}

/// Registry of entity type schemas.
///
/// Besides the schemas themselves, the registry keeps the reverse-reference
/// index (target type to incoming reference edges) that cascade deletion and
/// referential checks walk.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    types: HashMap<Arc<str>, Arc<EntityTypeSchema>>,
    /// Registration order, for deterministic iteration.
    order: Vec<Arc<str>>,
    /// Target type -> reference edges pointing at it.
    incoming: HashMap<Arc<str>, Vec<ReferenceEdge>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type schema.
    ///
    /// Reference targets must already be registered, except that a type may
    /// reference itself.
    ///
    /// # Errors
    ///
    /// Returns a schema error if:
    /// - the type name is already registered
    /// - two attributes share a name
    /// - a unique attribute has a non-hashable type
    /// - `cascade_delete_by` is set on a non-reference attribute
    /// - a reference names an unregistered type
    /// - a cascade reference would close a cycle
    pub fn register(&mut self, schema: EntityTypeSchema) -> Result<()> {
        self.validate(&schema)?;

        let name = Arc::clone(&schema.name);
        for attribute in &schema.attributes {
            if let Some(target) = attribute.reference_target() {
                self.incoming
                    .entry(Arc::clone(target))
                    .or_default()
                    .push(ReferenceEdge {
                        owner: Arc::clone(&name),
                        attribute: Arc::clone(&attribute.name),
                        cascade: attribute.cascade_delete_by,
                    });
            }
        }

        tracing::info!(
            entity_type = %name,
            attributes = schema.attributes.len(),
            local = schema.local,
            "registered entity type"
        );
        self.order.push(Arc::clone(&name));
        self.types.insert(name, Arc::new(schema));
        Ok(())
    }

    fn validate(&self, schema: &EntityTypeSchema) -> Result<()> {
        let entity_type = schema.name.to_string();

        if self.types.contains_key(&schema.name) {
            return Err(Error::schema(SchemaError::DuplicateEntityType(entity_type)));
        }

        let mut seen = HashSet::new();
        for attribute in &schema.attributes {
            if !seen.insert(&attribute.name) {
                return Err(Error::schema(SchemaError::DuplicateAttribute {
                    entity_type,
                    attribute: attribute.name.to_string(),
                }));
            }

            let ty = attribute.kind.value_type();
            if attribute.unique && !ty.is_hashable() {
                return Err(Error::schema(SchemaError::UnhashableUnique {
                    entity_type,
                    attribute: attribute.name.to_string(),
                    ty,
                }));
            }

            match attribute.reference_target() {
                None if attribute.cascade_delete_by => {
                    return Err(Error::schema(SchemaError::CascadeOnNonReference {
                        entity_type,
                        attribute: attribute.name.to_string(),
                    }));
                }
                Some(target) if *target != schema.name && !self.types.contains_key(target) => {
                    return Err(Error::schema(SchemaError::UnknownReferenceTarget {
                        entity_type,
                        attribute: attribute.name.to_string(),
                        target: target.to_string(),
                    }));
                }
                _ => {}
            }
        }

        if let Some(path) = self.cascade_cycle(schema) {
            return Err(Error::schema(SchemaError::CascadeCycle { entity_type, path }));
        }

        Ok(())
    }

    /// Searches for a cascade path from the new type back to itself.
    ///
    /// Cascade edges run from owner to target. Adding `schema` adds edges
    /// from it to each of its cascade targets; a cycle exists if any target
    /// can already reach `schema` through registered cascade edges.
    fn cascade_cycle(&self, schema: &EntityTypeSchema) -> Option<Vec<String>> {
        let start = &schema.name;
        let mut stack: Vec<(Arc<str>, Vec<String>)> = schema
            .attributes
            .iter()
            .filter(|a| a.cascade_delete_by)
            .filter_map(AttributeSchema::reference_target)
            .map(|t| (Arc::clone(t), vec![start.to_string(), t.to_string()]))
            .collect();
        let mut visited = HashSet::new();

        while let Some((current, path)) = stack.pop() {
            if current == *start {
                return Some(path);
            }
            if !visited.insert(Arc::clone(&current)) {
                continue;
            }
            for next in self.cascade_targets(&current) {
                let mut next_path = path.clone();
                next_path.push(next.to_string());
                stack.push((next, next_path));
            }
        }
        None
    }

    fn cascade_targets(&self, owner: &str) -> Vec<Arc<str>> {
        self.types.get(owner).map_or_else(Vec::new, |schema| {
            schema
                .attributes
                .iter()
                .filter(|a| a.cascade_delete_by)
                .filter_map(AttributeSchema::reference_target)
                .cloned()
                .collect()
        })
    }

    /// Gets the schema for an entity type.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntityTypeSchema> {
        self.types.get(name).map(Arc::as_ref)
    }

    /// Returns true if the entity type is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Returns the reference edges that point at entities of `target`.
    #[must_use]
    pub fn incoming_references(&self, target: &str) -> &[ReferenceEdge] {
        self.incoming.get(target).map_or(&[], Vec::as_slice)
    }

    /// Iterates registered schemas in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityTypeSchema> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.types.get(name).map(Arc::as_ref))
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
