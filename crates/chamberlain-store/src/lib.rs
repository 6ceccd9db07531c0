//! chamberlain-store
//!
//! Storage layer for Chamberlain:
//! - a key-value persistence substrate ([`KvBackend`]) with in-memory and
//!   filesystem implementations
//! - [`SceneStore`] and [`ConfigStore`] enforcing uniqueness and the scheme
//!   ledger rules with an atomic check-then-write
//! - the [`Chamberlain`] facade applying cross-entity policy

pub mod backend;
pub mod configs;
pub mod facade;
pub mod scenes;
pub mod table;

pub use backend::{KvBackend, MemoryBackend, Namespace, WriteLock};
#[cfg(feature = "fs")]
pub use backend::FsBackend;
pub use configs::{ConfigQuery, ConfigStore};
pub use facade::{Chamberlain, ConfigListParams, ListParams, NewConfig};
pub use scenes::{NewScene, SceneStore, SchemeUpdate, SchemeUpdateOutcome};
pub use table::Table;
