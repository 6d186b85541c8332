//! Integration tests for Layer 1: Storage
//!
//! Tests for schema registration, entity stores, cascade deletion, and
//! transactions.

mod cascade;
