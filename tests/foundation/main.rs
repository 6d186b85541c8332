//! Integration tests for Layer 0: Foundation
//!
//! Tests for values, live references, collections, and errors.

mod collections;
mod errors;
mod values;
