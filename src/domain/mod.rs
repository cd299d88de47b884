//! Monitor domain model
//!
//! Validated monitor configuration, the builder that produces it, and the registry that owns it.

pub mod builder;
pub mod monitor;
pub mod registry;
