//! HTTP transport layer for the admin API
//!
//! Maps the boundary endpoints onto the session authority and monitor store.

pub mod handlers;
