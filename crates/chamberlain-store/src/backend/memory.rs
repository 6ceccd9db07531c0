//! In-memory backend.

use std::collections::BTreeMap;

use chamberlain_core::ChamberlainResult;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::{KvBackend, Namespace, WriteLock};

/// A process-local backend holding one sorted map per namespace.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: RwLock<BTreeMap<Namespace, BTreeMap<String, Value>>>,
    writers: Mutex<()>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `ns`.
    pub fn len(&self, ns: Namespace) -> usize {
        self.inner.read().get(&ns).map_or(0, BTreeMap::len)
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, ns: Namespace, key: &str) -> ChamberlainResult<Option<Value>> {
        Ok(self
            .inner
            .read()
            .get(&ns)
            .and_then(|m| m.get(key))
            .cloned())
    }

    fn put(&self, ns: Namespace, key: &str, value: &Value) -> ChamberlainResult<()> {
        self.inner
            .write()
            .entry(ns)
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn put_new(&self, ns: Namespace, key: &str, value: &Value) -> ChamberlainResult<bool> {
        let mut inner = self.inner.write();
        let records = inner.entry(ns).or_default();
        if records.contains_key(key) {
            return Ok(false);
        }
        records.insert(key.to_string(), value.clone());
        Ok(true)
    }

    fn lock(&self) -> ChamberlainResult<WriteLock<'_>> {
        Ok(WriteLock::new(self.writers.lock()))
    }

    fn delete(&self, ns: Namespace, key: &str) -> ChamberlainResult<bool> {
        Ok(self
            .inner
            .write()
            .get_mut(&ns)
            .is_some_and(|m| m.remove(key).is_some()))
    }

    fn list(&self, ns: Namespace) -> ChamberlainResult<Vec<(String, Value)>> {
        Ok(self
            .inner
            .read()
            .get(&ns)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn namespaces_are_isolated() {
        let b = MemoryBackend::new();
        b.put(Namespace::Scenes, "a", &json!(1)).unwrap();
        assert_eq!(b.get(Namespace::Scenes, "a").unwrap(), Some(json!(1)));
        assert_eq!(b.get(Namespace::Configs, "a").unwrap(), None);
        assert_eq!(b.len(Namespace::Scenes), 1);
        assert_eq!(b.len(Namespace::Configs), 0);
    }

    #[test]
    fn list_is_sorted_and_delete_reports_presence() {
        let b = MemoryBackend::new();
        b.put(Namespace::Configs, "b", &json!("B")).unwrap();
        b.put(Namespace::Configs, "a", &json!("A")).unwrap();
        let keys: Vec<_> = b
            .list(Namespace::Configs)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);

        assert!(b.delete(Namespace::Configs, "a").unwrap());
        assert!(!b.delete(Namespace::Configs, "a").unwrap());
        assert!(!b.contains(Namespace::Configs, "a").unwrap());
    }

    #[test]
    fn put_new_keeps_existing_record() {
        let b = MemoryBackend::new();
        assert!(b.put_new(Namespace::Configs, "a", &json!(1)).unwrap());
        assert!(!b.put_new(Namespace::Configs, "a", &json!(2)).unwrap());
        assert_eq!(b.get(Namespace::Configs, "a").unwrap(), Some(json!(1)));
    }

    #[test]
    fn write_section_is_exclusive() {
        let b = MemoryBackend::new();
        let held = b.lock().unwrap();
        assert!(b.writers.try_lock().is_none());
        drop(held);
        assert!(b.writers.try_lock().is_some());
    }
}
