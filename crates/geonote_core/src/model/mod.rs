//! Domain model for geofenced reminders.
//!
//! # Responsibility
//! - Define the persisted reminder record and its creation input.
//! - Define the ephemeral position sample consumed by the evaluator.
//!
//! # Invariants
//! - Every reminder is identified by an id unique within its store.
//! - The `triggered` latch is owned by the proximity evaluator.

pub mod reminder;
