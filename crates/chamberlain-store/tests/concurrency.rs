use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chamberlain_core::config::CoreConfig;
use chamberlain_core::model::{Condition, Config};
use chamberlain_core::ChamberlainResult;
use chamberlain_store::{
    Chamberlain, KvBackend, MemoryBackend, Namespace, NewConfig, NewScene, SchemeUpdate,
    WriteLock,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

fn seeded() -> Arc<Chamberlain> {
    let ch = Chamberlain::new(Arc::new(MemoryBackend::new()), CoreConfig::default()).unwrap();
    ch.create_scene(NewScene {
        id: "race".into(),
        name: "Race".into(),
        description: None,
        scheme: json!({"properties": {"n": {"type": "integer"}}}),
        available_conditions: vec![],
    })
    .unwrap();
    Arc::new(ch)
}

#[test]
fn concurrent_creates_with_equal_conditions_yield_one_config() {
    let ch = seeded();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ch = Arc::clone(&ch);
            thread::spawn(move || {
                // Alternate the supplied order; the normalized set is the same.
                let mut conditions = vec![Condition::new("a", "1"), Condition::new("b", "2")];
                if i % 2 == 0 {
                    conditions.reverse();
                }
                ch.create_config(NewConfig {
                    scene_id: "race".into(),
                    scheme_version: None,
                    conditions,
                    config: json!({"n": i}),
                })
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_conflict()))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(ch.configs().count_for_scene("race").unwrap(), 1);
}

#[test]
fn concurrent_scheme_updates_get_distinct_versions() {
    let ch = seeded();
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let ch = Arc::clone(&ch);
            thread::spawn(move || {
                ch.update_scheme(
                    "race",
                    SchemeUpdate {
                        scheme: json!({"properties": {"n": {"type": "integer"}}}),
                        overwrite: false,
                        change_description: None,
                    },
                )
                .map(|o| o.version)
            })
        })
        .collect();

    let mut versions: Vec<u32> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    versions.sort_unstable();
    assert_eq!(versions, (2..=7).collect::<Vec<_>>());

    let ledger = ch.scheme_versions("race").unwrap();
    assert_eq!(ledger.len(), 7);
    assert_eq!(ledger.iter().filter(|v| v.is_active()).count(), 1);
    assert_eq!(ch.active_scheme("race").unwrap().unwrap().version, 7);
}

type Hook = Box<dyn FnOnce() + Send>;

/// Memory backend that runs a hook the first time the config namespace is
/// scanned, letting a test act in the middle of a facade operation.
#[derive(Default)]
struct InterleavingBackend {
    inner: MemoryBackend,
    on_config_scan: Mutex<Option<Hook>>,
}

impl KvBackend for InterleavingBackend {
    fn get(&self, ns: Namespace, key: &str) -> ChamberlainResult<Option<Value>> {
        self.inner.get(ns, key)
    }

    fn put(&self, ns: Namespace, key: &str, value: &Value) -> ChamberlainResult<()> {
        self.inner.put(ns, key, value)
    }

    fn put_new(&self, ns: Namespace, key: &str, value: &Value) -> ChamberlainResult<bool> {
        self.inner.put_new(ns, key, value)
    }

    fn lock(&self) -> ChamberlainResult<WriteLock<'_>> {
        self.inner.lock()
    }

    fn delete(&self, ns: Namespace, key: &str) -> ChamberlainResult<bool> {
        self.inner.delete(ns, key)
    }

    fn list(&self, ns: Namespace) -> ChamberlainResult<Vec<(String, Value)>> {
        if ns == Namespace::Configs {
            let hook = self.on_config_scan.lock().take();
            if let Some(hook) = hook {
                hook();
            }
        }
        self.inner.list(ns)
    }
}

#[test]
fn config_create_cannot_slip_into_scene_delete() {
    let backend = Arc::new(InterleavingBackend::default());
    let ch = Chamberlain::new(backend.clone(), CoreConfig::default()).unwrap();
    ch.create_scene(NewScene {
        id: "app".into(),
        name: "App".into(),
        description: None,
        scheme: json!({}),
        available_conditions: vec![],
    })
    .unwrap();

    // A second facade over the same storage creates a config while the first
    // one is counting the scene's configs.
    let other = Arc::new(Chamberlain::new(backend.clone(), CoreConfig::default()).unwrap());
    let racer: Arc<Mutex<Option<JoinHandle<ChamberlainResult<Config>>>>> =
        Arc::new(Mutex::new(None));
    let slot = Arc::clone(&racer);
    *backend.on_config_scan.lock() = Some(Box::new(move || {
        let handle = thread::spawn(move || {
            other.create_config(NewConfig {
                scene_id: "app".into(),
                scheme_version: None,
                conditions: vec![Condition::new("env", "prod")],
                config: json!({}),
            })
        });
        *slot.lock() = Some(handle);
        thread::sleep(Duration::from_millis(50));
    }));

    ch.delete_scene("app").unwrap();

    let handle = racer.lock().take().unwrap();
    let created = handle.join().unwrap();
    assert_eq!(created.unwrap_err().code(), "SCENE_NOT_FOUND");
    assert_eq!(backend.inner.len(Namespace::Configs), 0);
}
