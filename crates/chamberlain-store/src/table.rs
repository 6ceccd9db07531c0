//! Typed view over one backend namespace.

use std::marker::PhantomData;
use std::sync::Arc;

use chamberlain_core::{ChamberlainError, ChamberlainResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{KvBackend, Namespace, WriteLock};

/// Records of type `T` stored as JSON documents in a single namespace.
pub struct Table<T> {
    backend: Arc<dyn KvBackend>,
    ns: Namespace,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            ns: self.ns,
            _marker: PhantomData,
        }
    }
}

impl<T> Table<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn KvBackend>, ns: Namespace) -> Self {
        Self {
            backend,
            ns,
            _marker: PhantomData,
        }
    }

    /// Enter the backend's write section.
    pub fn lock(&self) -> ChamberlainResult<WriteLock<'_>> {
        self.backend.lock()
    }

    pub fn get(&self, key: &str) -> ChamberlainResult<Option<T>> {
        self.backend
            .get(self.ns, key)?
            .map(|v| self.decode(key, v))
            .transpose()
    }

    pub fn contains(&self, key: &str) -> ChamberlainResult<bool> {
        self.backend.contains(self.ns, key)
    }

    pub fn put(&self, key: &str, record: &T) -> ChamberlainResult<()> {
        let value = serde_json::to_value(record)?;
        self.backend.put(self.ns, key, &value)
    }

    /// Store `record` only if `key` is free. Returns false when it is taken.
    pub fn insert(&self, key: &str, record: &T) -> ChamberlainResult<bool> {
        let value = serde_json::to_value(record)?;
        self.backend.put_new(self.ns, key, &value)
    }

    pub fn delete(&self, key: &str) -> ChamberlainResult<bool> {
        self.backend.delete(self.ns, key)
    }

    /// Every record, in key order.
    pub fn list(&self) -> ChamberlainResult<Vec<T>> {
        self.backend
            .list(self.ns)?
            .into_iter()
            .map(|(k, v)| self.decode(&k, v))
            .collect()
    }

    fn decode(&self, key: &str, value: serde_json::Value) -> ChamberlainResult<T> {
        serde_json::from_value(value).map_err(|e| {
            ChamberlainError::serialization(format!(
                "{} record {key:?} does not decode: {e}",
                self.ns.as_str()
            ))
        })
    }
}
