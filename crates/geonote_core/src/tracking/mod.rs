//! Background location tracking.
//!
//! # Responsibility
//! - Define the platform location provider seam.
//! - Own the sampling subscription lifecycle (`Stopped -> Active -> Stopped`).
//!
//! # Invariants
//! - The subscription handle lives in controller instance state only.
//! - No sample is dispatched to the evaluator after `stop()` returns.

pub mod controller;
pub mod provider;
