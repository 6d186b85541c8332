//! Index lookup results.

use std::fmt;
use std::sync::Arc;

use lockstep_foundation::{EntityId, Error, ErrorContext, LtSet, Result, Value};

/// Entities matching an indexed-equality lookup.
///
/// A `Matches` is bound to the snapshot it was produced from and is not
/// affected by later writes. Iteration is lazy and finite; cloning is O(1), so
/// the sequence can be restarted by iterating a clone or calling [`iter`]
/// again.
///
/// [`iter`]: Matches::iter
#[derive(Clone)]
pub struct Matches {
    entity_type: Arc<str>,
    attribute: Arc<str>,
    value: Value,
    ids: LtSet<EntityId>,
}

impl Matches {
    pub(crate) fn new(
        entity_type: Arc<str>,
        attribute: Arc<str>,
        value: Value,
        ids: LtSet<EntityId>,
    ) -> Self {
        Self {
            entity_type,
            attribute,
            value,
            ids,
        }
    }

    /// Iterates the matching entity IDs.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter().copied()
    }

    /// Returns the number of matches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns true if `id` is among the matches.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns the only match, `None` if there are none.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if more than one entity matched.
    pub fn single(&self) -> Result<Option<EntityId>> {
        let mut iter = self.iter();
        let first = iter.next();
        if iter.next().is_some() {
            return Err(Error::invariant_violation(format!(
                "expected at most one {} with {} = {}, found {}",
                self.entity_type,
                self.attribute,
                self.value,
                self.len()
            ))
            .with_context(
                ErrorContext::new()
                    .with_entity_type(&*self.entity_type)
                    .with_attribute(&*self.attribute),
            ));
        }
        Ok(first)
    }
}

impl fmt::Debug for Matches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matches")
            .field("entity_type", &self.entity_type)
            .field("attribute", &self.attribute)
            .field("value", &self.value)
            .field("ids", &self.ids)
            .finish()
    }
}

impl IntoIterator for Matches {
    type Item = EntityId;
    type IntoIter = <LtSet<EntityId> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}
