//! Shared domain types for the on-air studio client.
//!
//! Everything here is a cached copy of backend-owned state. This crate
//! has zero internal deps so the client, sync layer and tooling can all
//! share it.

pub mod duration;
pub mod error;
pub mod models;
pub mod types;

pub use error::CoreError;
