//! Entity records, indices, cascade deletion, and transactions for Lockstep.
//!
//! This crate provides:
//! - [`SchemaRegistry`] - Entity type and attribute declarations
//! - [`EntityStore`] - Immutable store snapshot with structural sharing
//! - [`Matches`] - Results of indexed-equality lookups
//! - [`Engine`] / [`Transaction`] - Optimistic transactions over snapshots

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod entity;
mod index;
mod query;
mod schema;
mod store;
mod transaction;

pub use config::EngineConfig;
pub use entity::EidAllocator;
pub use index::AttributeIndex;
pub use query::Matches;
pub use schema::{
    AttributeKind, AttributeSchema, EntityTypeSchema, ReferenceEdge, SchemaRegistry,
};
pub use store::{EntityRecord, EntityStore};
pub use transaction::{Engine, Transaction, TransactionStatus, WriteOp};
