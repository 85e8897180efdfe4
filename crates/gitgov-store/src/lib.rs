// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use gitgov_error::GitGovError;

/// Escape an id for use as a filename: record ids may contain `:`
/// (actor/agent ids do), which is not permitted as part of some
/// filesystems' path segments outside the first character on Windows, so
/// it is replaced with `_`. No record id pattern in the workspace's schema
/// set uses `_`, so the mapping is reversible.
#[must_use]
pub fn escape_id(id: &str) -> String {
    id.replace(':', "_")
}

/// Reverse of [`escape_id`].
#[must_use]
pub fn unescape_id(filename_stem: &str) -> String {
    filename_stem.replace('_', ":")
}

/// Typed CRUD over one record category.
///
/// Implementations must guarantee that a successful [`RecordStore::put`]
/// is immediately visible to [`RecordStore::get`] and [`RecordStore::list`]
/// — no partial writes, no stale reads of an in-flight write.
pub trait RecordStore<T> {
    /// List the ids of every record currently stored, in no particular
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the backend cannot be listed.
    fn list(&self) -> Result<Vec<String>, GitGovError>;

    /// Load the record stored under `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the backend could not be read,
    /// or if the stored content does not parse as `T`. A missing id is
    /// `Ok(None)`, not an error.
    fn get(&self, id: &str) -> Result<Option<T>, GitGovError>;

    /// Store `record` under `id`, overwriting any existing record.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the write fails.
    fn put(&mut self, id: &str, record: &T) -> Result<(), GitGovError>;

    /// Store several records as one batch. Implementations should prefer
    /// to apply all-or-nothing where the backend allows it; the filesystem
    /// backend applies them independently in order and stops at the first
    /// failure, leaving prior entries in the batch written (callers that
    /// need transactional all-or-nothing semantics across two stores, e.g.
    /// task ↔ cycle bidirectional writes, implement that at the adapter
    /// layer — see `gitgov-backlog`).
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if any write fails.
    fn put_many(&mut self, records: &[(String, T)]) -> Result<(), GitGovError> {
        for (id, record) in records {
            self.put(id, record)?;
        }
        Ok(())
    }

    /// Remove the record stored under `id`. A no-op if absent.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the backend cannot remove the
    /// entry.
    fn delete(&mut self, id: &str) -> Result<(), GitGovError>;

    /// Whether a record is stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the backend cannot be queried.
    fn exists(&self, id: &str) -> Result<bool, GitGovError> {
        Ok(self.get(id)?.is_some())
    }
}

/// Filesystem-backed [`RecordStore`]: one pretty-printed JSON file per
/// record under `root`, named `<escape_id(id)>.json`, written atomically
/// (temp sibling + rename).
#[derive(Debug, Clone)]
pub struct FsRecordStore<T> {
    root: PathBuf,
    _marker: std::marker::PhantomData<T>,
}

impl<T> FsRecordStore<T> {
    /// Open (without creating) a filesystem store rooted at `root`, e.g.
    /// `.gitgov/tasks`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _marker: std::marker::PhantomData,
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", escape_id(id)))
    }

    fn ensure_root(&self) -> Result<(), GitGovError> {
        fs::create_dir_all(&self.root).map_err(|e| GitGovError::io("create record store directory", e))
    }
}

impl<T> RecordStore<T> for FsRecordStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn list(&self) -> Result<Vec<String>, GitGovError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| GitGovError::io("list record store directory", e))? {
            let entry = entry.map_err(|e| GitGovError::io("read record store directory entry", e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(unescape_id(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn get(&self, id: &str) -> Result<Option<T>, GitGovError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| GitGovError::io("read record file", e))?;
        let record = serde_json::from_slice(&bytes).map_err(|e| GitGovError::io("parse record file", e))?;
        Ok(Some(record))
    }

    fn put(&mut self, id: &str, record: &T) -> Result<(), GitGovError> {
        self.ensure_root()?;
        let path = self.path_for(id);
        let mut json = serde_json::to_string_pretty(record).map_err(|e| GitGovError::io("serialize record", e))?;
        json.push('\n');

        let mut tmp = tempfile::NamedTempFile::new_in(&self.root).map_err(|e| GitGovError::io("create temp record file", e))?;
        tmp.write_all(json.as_bytes()).map_err(|e| GitGovError::io("write temp record file", e))?;
        tmp.flush().map_err(|e| GitGovError::io("flush temp record file", e))?;
        tmp.persist(&path).map_err(|e| GitGovError::io("rename temp record file", e.error))?;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), GitGovError> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GitGovError::io("remove record file", e)),
        }
    }
}

/// In-memory [`RecordStore`], used by adapter unit tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore<T> {
    records: BTreeMap<String, T>,
}

impl<T> MemoryRecordStore<T> {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { records: BTreeMap::new() }
    }
}

impl<T: Clone> RecordStore<T> for MemoryRecordStore<T> {
    fn list(&self) -> Result<Vec<String>, GitGovError> {
        Ok(self.records.keys().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<T>, GitGovError> {
        Ok(self.records.get(id).cloned())
    }

    fn put(&mut self, id: &str, record: &T) -> Result<(), GitGovError> {
        self.records.insert(id.to_string(), record.clone());
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), GitGovError> {
        self.records.remove(id);
        Ok(())
    }
}

/// Resolve the absolute path a record with `id` would live at under a
/// category root, without reading or writing it. Used by the lint module
/// to cross-check the file-naming convention (§4.12 step 8).
#[must_use]
pub fn record_path(category_root: &Path, id: &str) -> PathBuf {
    category_root.join(format!("{}.json", escape_id(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Dummy {
        value: u32,
    }

    #[test]
    fn escape_and_unescape_round_trip_for_actor_ids() {
        let id = "human:alice";
        assert_eq!(unescape_id(&escape_id(id)), id);
    }

    #[test]
    fn fs_store_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: FsRecordStore<Dummy> = FsRecordStore::new(dir.path());
        store.put("human:alice", &Dummy { value: 42 }).unwrap();
        let loaded = store.get("human:alice").unwrap().unwrap();
        assert_eq!(loaded, Dummy { value: 42 });
    }

    #[test]
    fn fs_store_list_unescapes_colons() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: FsRecordStore<Dummy> = FsRecordStore::new(dir.path());
        store.put("human:alice", &Dummy { value: 1 }).unwrap();
        store.put("1700000000-task-example", &Dummy { value: 2 }).unwrap();
        let mut ids = store.list().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["1700000000-task-example".to_string(), "human:alice".to_string()]);
    }

    #[test]
    fn fs_store_delete_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: FsRecordStore<Dummy> = FsRecordStore::new(dir.path());
        store.delete("human:nobody").unwrap();
    }

    #[test]
    fn fs_store_exists_reflects_put_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: FsRecordStore<Dummy> = FsRecordStore::new(dir.path());
        assert!(!store.exists("human:alice").unwrap());
        store.put("human:alice", &Dummy { value: 1 }).unwrap();
        assert!(store.exists("human:alice").unwrap());
        store.delete("human:alice").unwrap();
        assert!(!store.exists("human:alice").unwrap());
    }

    #[test]
    fn memory_store_put_many() {
        let mut store: MemoryRecordStore<Dummy> = MemoryRecordStore::new();
        store
            .put_many(&[
                ("a".to_string(), Dummy { value: 1 }),
                ("b".to_string(), Dummy { value: 2 }),
            ])
            .unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn record_path_matches_escaped_filename() {
        let root = Path::new("/tmp/.gitgov/actors");
        let path = record_path(root, "human:alice");
        assert_eq!(path, Path::new("/tmp/.gitgov/actors/human_alice.json"));
    }
}
