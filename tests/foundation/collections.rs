//! Integration tests for persistent collections
//!
//! Tests structural sharing and borrowed-key lookups.

use std::sync::Arc;

use lockstep_foundation::{EntityId, LtMap, LtSet};

// =============================================================================
// LtSet
// =============================================================================

#[test]
fn set_updates_leave_original_untouched() {
    let base: LtSet<EntityId> = [1, 2, 3].into_iter().map(EntityId::new).collect();
    let grown = base.insert(EntityId::new(4));
    let shrunk = base.remove(&EntityId::new(1));

    assert_eq!(base.len(), 3);
    assert_eq!(grown.len(), 4);
    assert_eq!(shrunk.len(), 2);
    assert!(!shrunk.contains(&EntityId::new(1)));
}

#[test]
fn set_iterates_owned_and_borrowed() {
    let set: LtSet<u64> = (0..5).collect();

    let borrowed: u64 = (&set).into_iter().sum();
    let owned: u64 = set.into_iter().sum();
    assert_eq!(borrowed, 10);
    assert_eq!(owned, 10);
}

// =============================================================================
// LtMap
// =============================================================================

#[test]
fn map_supports_str_lookup_on_arc_keys() {
    let map: LtMap<Arc<str>, i64> = LtMap::new().insert(Arc::from("projectId"), 1);

    assert_eq!(map.get("projectId"), Some(&1));
    assert!(map.contains_key("projectId"));
    assert!(map.remove("projectId").is_empty());
    assert_eq!(map.len(), 1);
}

#[test]
fn alter_inserts_updates_and_removes() {
    let map: LtMap<&str, i64> = LtMap::new();

    let map = map.alter("n", |old| Some(old.copied().unwrap_or(0) + 1));
    let map = map.alter("n", |old| Some(old.copied().unwrap_or(0) + 1));
    assert_eq!(map.get("n"), Some(&2));

    let map = map.alter("n", |_| None);
    assert!(map.is_empty());
}

#[test]
fn map_equality_is_structural() {
    let a: LtMap<u8, u8> = [(1, 1), (2, 2)].into_iter().collect();
    let b = LtMap::new().insert(2, 2).insert(1, 1);
    assert_eq!(a, b);
}
