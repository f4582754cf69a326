//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, evaluator and tracking into host-facing APIs.
//! - Keep FFI/CLI layers decoupled from storage and provider details.

pub mod reminder_service;
