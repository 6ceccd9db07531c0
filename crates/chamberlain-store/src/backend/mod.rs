//! Key-value persistence substrate.
//!
//! The stores treat persistence as an opaque synchronous dependency with
//! read-your-writes semantics. A backend offers primary-key access to JSON
//! documents grouped by [`Namespace`], an insert-only write, and an exclusive
//! write section shared by every handle over the same storage. Uniqueness and
//! ledger policy live in the stores above it.

use chamberlain_core::ChamberlainResult;
use serde_json::Value;

pub mod memory;

#[cfg(feature = "fs")]
pub mod fs;

pub use memory::MemoryBackend;

#[cfg(feature = "fs")]
pub use fs::FsBackend;

/// A group of records sharing one key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    Scenes,
    Configs,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Scenes, Namespace::Configs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scenes => "scenes",
            Self::Configs => "configs",
        }
    }
}

/// Held while a caller owns a backend's write section. Dropping it releases
/// the section.
pub struct WriteLock<'a> {
    _held: Box<dyn Held + 'a>,
}

trait Held {}

impl<T> Held for T {}

impl<'a> WriteLock<'a> {
    /// Wrap whatever guard keeps the section closed to other writers.
    pub fn new<G: 'a>(guard: G) -> Self {
        Self {
            _held: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for WriteLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WriteLock")
    }
}

/// Primary-key storage for JSON documents.
///
/// Implementations must be thread-safe and single operations atomic.
/// Multi-step read-check-write sequences run inside [`KvBackend::lock`], which
/// excludes every other handle over the same storage, including handles in
/// other processes where the backend is shared that way.
pub trait KvBackend: Send + Sync {
    fn get(&self, ns: Namespace, key: &str) -> ChamberlainResult<Option<Value>>;

    /// Insert or overwrite.
    fn put(&self, ns: Namespace, key: &str, value: &Value) -> ChamberlainResult<()>;

    /// Insert only if `key` is absent. Returns false, writing nothing, when a
    /// record already exists.
    fn put_new(&self, ns: Namespace, key: &str, value: &Value) -> ChamberlainResult<bool>;

    /// Enter the exclusive write section. Not reentrant.
    fn lock(&self) -> ChamberlainResult<WriteLock<'_>>;

    /// Remove a record. Returns whether it existed.
    fn delete(&self, ns: Namespace, key: &str) -> ChamberlainResult<bool>;

    /// All records of a namespace, sorted by key.
    fn list(&self, ns: Namespace) -> ChamberlainResult<Vec<(String, Value)>>;

    fn contains(&self, ns: Namespace, key: &str) -> ChamberlainResult<bool> {
        Ok(self.get(ns, key)?.is_some())
    }
}
