use crate::error::Result;
use crate::paths;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A stored record. Collections hold loosely shaped documents; typed access
/// goes through [`get_typed`] / [`set_typed`].
pub type Document = serde_yaml::Value;

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Document store the engine reads manuals from and writes progress to.
///
/// Writes are last-write-wins at the document level. Progress documents layer
/// a version check on top (see `OnboardingProgress::save`).
pub trait RecordStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;
    fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()>;
    /// Ids present in `collection`, sorted.
    fn list(&self, collection: &str) -> Result<Vec<String>>;
}

pub fn get_typed<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: &str,
    id: &str,
) -> Result<Option<T>> {
    match store.get(collection, id)? {
        Some(doc) => Ok(Some(serde_yaml::from_value(doc)?)),
        None => Ok(None),
    }
}

pub fn set_typed<T: Serialize>(
    store: &dyn RecordStore,
    collection: &str,
    id: &str,
    value: &T,
) -> Result<()> {
    let doc = serde_yaml::to_value(value)?;
    store.set(collection, id, doc)
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// One YAML file per record under `<root>/.relish/<collection>/<id>.yaml`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RecordStore for FileStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        paths::validate_id(id)?;
        let path = paths::record_path(&self.root, collection, id);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_yaml::from_str(&data)?))
    }

    fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        paths::validate_id(id)?;
        let path = paths::record_path(&self.root, collection, id);
        let data = serde_yaml::to_string(&doc)?;
        tracing::debug!(collection, id, path = %path.display(), "writing record");
        crate::io::atomic_write(&path, data.as_bytes())
    }

    fn list(&self, collection: &str) -> Result<Vec<String>> {
        let dir = paths::collection_dir(&self.root, collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(paths::RECORD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<(String, String), Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.get(&(collection.to_string(), id.to_string())).cloned())
    }

    fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.insert((collection.to_string(), id.to_string()), doc);
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<String>> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| id.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
