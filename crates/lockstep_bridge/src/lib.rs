//! Identity bridging between distributable and process-local entities.
//!
//! This crate provides:
//! - [`SharedEntity`] / [`LocalEntity`] - The two halves of a project identity
//! - [`IdentityBridge`] - Binding, lookup, and teardown operations
//! - [`QueryFacade`] - Strict and `_or_null` conversions for host code
//! - [`wire`] - Encoding and decoding of replicated records

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod bridge;
mod entities;
mod facade;
mod project;
pub mod wire;

pub use bridge::IdentityBridge;
pub use entities::{
    BridgeEntity, LIVE_OBJECT, LOCAL_ENTITY, LocalEntity, PROJECT_ID, SHARED_ENTITY, SHARED_REF,
    SharedEntity, local_entity_schema,
};
pub use facade::QueryFacade;
pub use project::{Project, ProjectId};
pub use wire::{DecoderRegistry, ReplicatedRecord, WireRecord, encode_shared, export_replicated};
