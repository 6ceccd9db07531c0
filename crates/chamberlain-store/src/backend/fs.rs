//! Filesystem backend.
//!
//! Each record is a JSON envelope file:
//!
//! ```text
//! <root>/
//! ├── .lock                                  write section (advisory lock)
//! ├── scenes/
//! │   └── <sha256("scenes" 0x00 key)>.json   {"key": "...", "value": {...}}
//! └── configs/
//!     └── ...
//! ```
//!
//! File names are hashed because config ids contain `:` and `,`, which are not
//! portable in paths. The envelope keeps the original key so `list` can recover
//! it. Writes go to a dotted temp file unique to the writer and are then
//! renamed into place, or hard-linked for insert-only writes so an existing
//! record is never replaced.
//!
//! The write section is an exclusive `flock`-style lock on `.lock`, so every
//! handle over the same root contends for it, across processes too.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chamberlain_core::determinism::hashing::hash_key_hex;
use chamberlain_core::{ChamberlainError, ChamberlainResult};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{KvBackend, Namespace, WriteLock};

const LOCK_FILE: &str = ".lock";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    value: Value,
}

/// Backend storing one JSON file per record under a root directory.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> ChamberlainResult<Self> {
        let root = root.into();
        for ns in Namespace::ALL {
            let dir = root.join(ns.as_str());
            fs::create_dir_all(&dir).map_err(|e| io_error("create directory", &dir, e))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, ns: Namespace) -> PathBuf {
        self.root.join(ns.as_str())
    }

    fn record_path(&self, ns: Namespace, key: &str) -> PathBuf {
        self.dir(ns)
            .join(format!("{}.json", hash_key_hex(ns.as_str(), key)))
    }

    fn temp_path(&self, ns: Namespace, key: &str) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir(ns).join(format!(
            ".{}.{}.{seq}.tmp",
            hash_key_hex(ns.as_str(), key),
            std::process::id()
        ))
    }

    /// Serialize the envelope for `key` into a fresh temp file.
    fn write_temp(&self, ns: Namespace, key: &str, value: &Value) -> ChamberlainResult<PathBuf> {
        let env = Envelope {
            key: key.to_string(),
            value: value.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&env)?;
        let temp = self.temp_path(ns, key);
        if let Err(e) = fs::write(&temp, bytes) {
            let _ = fs::remove_file(&temp);
            return Err(io_error("write", &temp, e));
        }
        Ok(temp)
    }

    fn read_envelope(path: &Path) -> ChamberlainResult<Option<Envelope>> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", path, e)),
        };
        let env: Envelope = serde_json::from_slice(&bytes).map_err(|e| {
            ChamberlainError::serialization(format!("corrupt record {}: {e}", path.display()))
        })?;
        Ok(Some(env))
    }
}

fn io_error(op: &str, path: &Path, e: std::io::Error) -> ChamberlainError {
    ChamberlainError::storage(format!("{op} {}: {e}", path.display()))
}

impl KvBackend for FsBackend {
    fn get(&self, ns: Namespace, key: &str) -> ChamberlainResult<Option<Value>> {
        let path = self.record_path(ns, key);
        match Self::read_envelope(&path)? {
            None => Ok(None),
            Some(env) if env.key == key => Ok(Some(env.value)),
            Some(env) => Err(ChamberlainError::invariant(format!(
                "record {} holds key {:?}, expected {:?}",
                path.display(),
                env.key,
                key
            ))),
        }
    }

    fn put(&self, ns: Namespace, key: &str, value: &Value) -> ChamberlainResult<()> {
        let path = self.record_path(ns, key);
        let temp = self.write_temp(ns, key, value)?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(io_error("rename", &temp, e));
        }
        Ok(())
    }

    fn put_new(&self, ns: Namespace, key: &str, value: &Value) -> ChamberlainResult<bool> {
        let path = self.record_path(ns, key);
        let temp = self.write_temp(ns, key, value)?;
        // Linking fails when the target exists, so a complete record appears
        // atomically or not at all.
        let linked = fs::hard_link(&temp, &path);
        let _ = fs::remove_file(&temp);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_error("link", &path, e)),
        }
    }

    fn lock(&self) -> ChamberlainResult<WriteLock<'_>> {
        let path = self.root.join(LOCK_FILE);
        let file: File = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| io_error("open", &path, e))?;
        FileExt::lock_exclusive(&file).map_err(|e| io_error("lock", &path, e))?;
        // Closing the file releases the lock.
        Ok(WriteLock::new(file))
    }

    fn delete(&self, ns: Namespace, key: &str) -> ChamberlainResult<bool> {
        let path = self.record_path(ns, key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }

    fn list(&self, ns: Namespace) -> ChamberlainResult<Vec<(String, Value)>> {
        let dir = self.dir(ns);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list", &dir, e)),
        };

        let mut out = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error("list", &dir, e))?.path();

            // Skip temp files and anything that is not a record.
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
            {
                continue;
            }

            if let Some(env) = Self::read_envelope(&path)? {
                out.push((env.key, env.value));
            }
        }

        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn backend() -> (FsBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let b = FsBackend::open(dir.path().join("store")).unwrap();
        (b, dir)
    }

    #[test]
    fn put_get_delete() {
        let (b, _dir) = backend();
        let key = "env_db:env:prod";
        b.put(Namespace::Configs, key, &json!({"host": "db1"})).unwrap();
        assert_eq!(
            b.get(Namespace::Configs, key).unwrap(),
            Some(json!({"host": "db1"}))
        );
        assert!(b.delete(Namespace::Configs, key).unwrap());
        assert_eq!(b.get(Namespace::Configs, key).unwrap(), None);
        assert!(!b.delete(Namespace::Configs, key).unwrap());
    }

    #[test]
    fn list_recovers_keys_and_skips_temp_files() {
        let (b, _dir) = backend();
        b.put(Namespace::Scenes, "zeta", &json!(2)).unwrap();
        b.put(Namespace::Scenes, "alpha", &json!(1)).unwrap();
        fs::write(b.dir(Namespace::Scenes).join(".partial.1.0.tmp"), b"{").unwrap();

        let listed = b.list(Namespace::Scenes).unwrap();
        assert_eq!(
            listed,
            vec![("alpha".to_string(), json!(1)), ("zeta".to_string(), json!(2))]
        );
        assert!(b.list(Namespace::Configs).unwrap().is_empty());
    }

    #[test]
    fn overwrite_replaces_value() {
        let (b, _dir) = backend();
        b.put(Namespace::Scenes, "s", &json!(1)).unwrap();
        b.put(Namespace::Scenes, "s", &json!(2)).unwrap();
        assert_eq!(b.get(Namespace::Scenes, "s").unwrap(), Some(json!(2)));
        assert_eq!(b.list(Namespace::Scenes).unwrap().len(), 1);
    }

    #[test]
    fn reopen_sees_existing_records() {
        let (b, _dir) = backend();
        b.put(Namespace::Scenes, "s", &json!({"a": 1})).unwrap();
        let again = FsBackend::open(b.root()).unwrap();
        assert_eq!(again.get(Namespace::Scenes, "s").unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn put_new_never_replaces() {
        let (b, _dir) = backend();
        assert!(b.put_new(Namespace::Configs, "app:default", &json!(1)).unwrap());
        assert!(!b.put_new(Namespace::Configs, "app:default", &json!(2)).unwrap());
        assert_eq!(
            b.get(Namespace::Configs, "app:default").unwrap(),
            Some(json!(1))
        );
        assert_eq!(leftover_temp_files(&b, Namespace::Configs), 0);
    }

    #[test]
    fn put_new_across_handles() {
        let (a, _dir) = backend();
        let b = FsBackend::open(a.root()).unwrap();
        assert!(a.put_new(Namespace::Scenes, "s", &json!("a")).unwrap());
        assert!(!b.put_new(Namespace::Scenes, "s", &json!("b")).unwrap());
        assert_eq!(b.get(Namespace::Scenes, "s").unwrap(), Some(json!("a")));
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let (b, _dir) = backend();
        // A directory in the record's place makes the rename fail.
        fs::create_dir(b.record_path(Namespace::Scenes, "s")).unwrap();
        fs::write(b.record_path(Namespace::Scenes, "s").join("x"), b"1").unwrap();
        assert!(b.put(Namespace::Scenes, "s", &json!(1)).is_err());
        assert_eq!(leftover_temp_files(&b, Namespace::Scenes), 0);
    }

    #[test]
    fn write_section_excludes_other_handles() {
        let (a, _dir) = backend();
        let b = FsBackend::open(a.root()).unwrap();
        let held = a.lock().unwrap();

        let other = OpenOptions::new()
            .write(true)
            .open(b.root().join(LOCK_FILE))
            .unwrap();
        assert!(FileExt::try_lock_exclusive(&other).is_err());
        drop(held);
        assert!(FileExt::try_lock_exclusive(&other).is_ok());
    }

    fn leftover_temp_files(b: &FsBackend, ns: Namespace) -> usize {
        fs::read_dir(b.dir(ns))
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")
            })
            .count()
    }
}
