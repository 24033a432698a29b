//! ventifact-core — pure domain logic for the Blueprints storage engine.
//!
//! Depends on nothing but `chrono`/`serde`/`thiserror`/`sha3`. Postgres access
//! lives entirely in `ventifact-postgres`, which implements the port traits
//! defined here.

pub mod digest;
pub mod error;
pub mod ports;
pub mod result_spec;
pub mod types;

pub use error::VentifactError;
pub use types::*;
