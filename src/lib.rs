//! Lockstep - Identity bridging over an in-memory entity store
//!
//! This crate re-exports all layers of the Lockstep system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: lockstep_bridge     — SharedEntity/LocalEntity binding, query facade, replication
//! Layer 1: lockstep_storage    — Schemas, entity store, indices, cascade delete, transactions
//! Layer 0: lockstep_foundation — Core types (Value, EntityId, Error)
//! ```

pub use lockstep_bridge as bridge;
pub use lockstep_foundation as foundation;
pub use lockstep_storage as storage;
