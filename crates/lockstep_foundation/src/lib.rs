//! Core identifiers, values, errors, and persistent collections for Lockstep.
//!
//! This crate provides:
//! - [`EntityId`] - Stable, never-reused entity identifiers
//! - [`Value`] - Attribute values, including process-local [`LiveRef`]s
//! - [`Type`] - Type descriptors for attribute validation
//! - [`Error`] - Typed errors with context
//! - Persistent collections ([`LtSet`], [`LtMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod collections;
mod entity;
mod error;
mod types;
mod value;

pub use collections::{LtMap, LtSet};
pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind, SchemaError};
pub use types::Type;
pub use value::{LiveRef, Value};

/// Result type for Lockstep operations.
pub type Result<T> = std::result::Result<T, Error>;
