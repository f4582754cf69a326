//! Repository layer for reminder persistence.
//!
//! # Responsibility
//! - Own the persisted reminder collection and its mutation rules.
//! - Isolate blob encoding details from the evaluator and service layers.
//!
//! # Invariants
//! - Write paths validate input before persistence.
//! - Read paths skip malformed records instead of failing the whole read.

pub mod reminder_store;
