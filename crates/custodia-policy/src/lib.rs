//! Access policy for Custodia stores.
//!
//! Decides whether a user may view a field (permission-driven) and whether
//! a field may be modified (structural: immutable fields and locked
//! records, independent of the acting user).

pub mod builtin;
pub mod engine;

pub use engine::AccessPolicy;
