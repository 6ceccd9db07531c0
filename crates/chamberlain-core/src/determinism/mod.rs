//! Determinism helpers.
//!
//! Everything that feeds a persisted identifier (config ids, condition hashes,
//! list ordering) goes through this module so that ordering and encoding rules
//! stay visible and auditable in one place.

pub mod escape;
pub mod hashing;
pub mod stable_sort;
