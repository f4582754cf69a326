//! Host-facing bindings for GeoNote core.
//!
//! # Responsibility
//! - Re-export the flutter_rust_bridge API surface.

pub mod api;
