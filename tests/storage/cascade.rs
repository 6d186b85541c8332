//! Integration tests for cascade deletion
//!
//! Tests removal order, index cleanup, and referential restrictions.

use lockstep_foundation::{ErrorKind, Value};
use lockstep_storage::{AttributeSchema, EntityStore, EntityTypeSchema};

fn tree() -> EntityStore {
    EntityStore::new()
        .register(EntityTypeSchema::new("Org"))
        .unwrap()
        .register(
            EntityTypeSchema::new("Team")
                .with_attribute(AttributeSchema::reference("org", "Org").cascade_delete_by()),
        )
        .unwrap()
        .register(
            EntityTypeSchema::new("Member")
                .with_attribute(AttributeSchema::reference("team", "Team").cascade_delete_by()),
        )
        .unwrap()
        .register(
            EntityTypeSchema::new("Audit").with_attribute(AttributeSchema::reference("org", "Org")),
        )
        .unwrap()
}

// =============================================================================
// Cascade Order
// =============================================================================

#[test]
fn dependents_are_removed_before_their_targets() {
    let (store, org) = tree().create("Org", &[]).unwrap();
    let (store, t1) = store.create("Team", &[("org", Value::EntityRef(org))]).unwrap();
    let (store, t2) = store.create("Team", &[("org", Value::EntityRef(org))]).unwrap();
    let (store, m1) = store.create("Member", &[("team", Value::EntityRef(t1))]).unwrap();
    let (store, m2) = store.create("Member", &[("team", Value::EntityRef(t2))]).unwrap();

    let (after, removed) = store.delete(org).unwrap();

    assert_eq!(removed.len(), 5);
    assert_eq!(removed.last(), Some(&org));
    let pos = |id| removed.iter().position(|r| *r == id).unwrap();
    assert!(pos(m1) < pos(t1));
    assert!(pos(m2) < pos(t2));
    assert!(after.is_empty());
    assert_eq!(after.index_len(), 0);
}

#[test]
fn deleting_a_middle_node_keeps_its_ancestors() {
    let (store, org) = tree().create("Org", &[]).unwrap();
    let (store, team) = store.create("Team", &[("org", Value::EntityRef(org))]).unwrap();
    let (store, member) = store.create("Member", &[("team", Value::EntityRef(team))]).unwrap();

    let (after, removed) = store.delete(team).unwrap();

    assert_eq!(removed, vec![member, team]);
    assert!(after.exists(org));
    assert!(after
        .find("Team", "org", &Value::EntityRef(org))
        .unwrap()
        .is_empty());
}

// =============================================================================
// Restrictions
// =============================================================================

#[test]
fn plain_reference_blocks_deletion() {
    let (store, org) = tree().create("Org", &[]).unwrap();
    let (store, team) = store.create("Team", &[("org", Value::EntityRef(org))]).unwrap();
    let (store, audit) = store.create("Audit", &[("org", Value::EntityRef(org))]).unwrap();

    let err = store.delete(org).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ConstraintViolation(_)));
    assert!(store.exists(team));

    let (store, _) = store.delete(audit).unwrap();
    let (store, removed) = store.delete(org).unwrap();
    assert_eq!(removed, vec![team, org]);
    assert!(store.is_empty());
}

#[test]
fn deleted_ids_are_not_reused() {
    let (store, org) = tree().create("Org", &[]).unwrap();
    let (store, _) = store.delete(org).unwrap();
    let (_, again) = store.create("Org", &[]).unwrap();
    assert_ne!(org, again);
    assert!(again > org);
}
