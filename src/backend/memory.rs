//! In-memory `DocumentCollection`, optionally snapshotted to a directory as
//! pretty JSON: a `parking_lot::RwLock`-guarded map, lazily created per
//! name, with a best-effort persistence path rather than a WAL.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identifier::Identifier;

use super::{
    default_sort_suffix, reject_reserved_index_name, BackendError, Cursor, DiscriminatorWire,
    DocumentCollection, IndexSpec, ScanFilter, SortField, StoredDoc,
};

#[derive(Serialize, Deserialize)]
struct WireDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_dataset")]
    dataset: String,
    #[serde(rename = "_key")]
    key: String,
    #[serde(rename = "_t")]
    discriminator: DiscriminatorWire,
    #[serde(flatten)]
    payload: serde_json::Map<String, serde_json::Value>,
}

impl From<&StoredDoc> for WireDoc {
    fn from(d: &StoredDoc) -> Self {
        WireDoc {
            id: d.id.to_hex(),
            dataset: d.dataset.to_hex(),
            key: d.key.clone(),
            discriminator: d.discriminator.clone(),
            payload: d.payload.clone(),
        }
    }
}

impl TryFrom<WireDoc> for StoredDoc {
    type Error = BackendError;
    fn try_from(w: WireDoc) -> Result<Self, Self::Error> {
        Ok(StoredDoc {
            id: Identifier::from_hex(&w.id).map_err(|e| BackendError::Encoding(serde_json::Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))))?,
            dataset: Identifier::from_hex(&w.dataset).map_err(|e| BackendError::Encoding(serde_json::Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))))?,
            key: w.key,
            discriminator: w.discriminator,
            payload: w.payload,
        })
    }
}

struct Inner {
    docs: HashMap<Identifier, StoredDoc>,
    indexes: HashMap<String, Vec<SortField>>,
    default_index_created: bool,
}

/// A single named in-memory collection, shared via `Arc` so it can be
/// handed out to RecordStore/ResolutionEngine/QueryPlanner without cloning
/// the underlying data.
#[derive(Clone)]
pub struct MemoryCollection {
    inner: Arc<RwLock<Inner>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                docs: HashMap::new(),
                indexes: HashMap::new(),
                default_index_created: false,
            })),
            snapshot_path: None,
        }
    }

    /// Load an existing JSON snapshot (if any) and remember `path` so
    /// `flush` can persist future writes there.
    pub fn open_at(dir: impl AsRef<Path>, collection_name: &str) -> Result<Self, BackendError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", collection_name));
        let mut collection = Self::new();
        collection.snapshot_path = Some(path.clone());
        if path.exists() {
            let bytes = fs::read(&path)?;
            let wire_docs: Vec<WireDoc> = serde_json::from_slice(&bytes)?;
            let mut inner = collection.inner.write();
            for w in wire_docs {
                let doc: StoredDoc = w.try_into()?;
                inner.docs.insert(doc.id, doc);
            }
        }
        Ok(collection)
    }

    /// Persist the full contents to the snapshot path, if one was configured.
    pub fn flush(&self) -> Result<(), BackendError> {
        let Some(path) = &self.snapshot_path else { return Ok(()) };
        let inner = self.inner.read();
        let mut docs: Vec<&StoredDoc> = inner.docs.values().collect();
        docs.sort_by_key(|d| d.id);
        let wire: Vec<WireDoc> = docs.iter().map(|d| WireDoc::from(*d)).collect();
        let bytes = serde_json::to_vec_pretty(&wire)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        debug!(target: "temporal_store::backend::memory", "flushed snapshot to {}", path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentCollection for MemoryCollection {
    fn insert_unique(&self, doc: StoredDoc) -> Result<(), BackendError> {
        let mut inner = self.inner.write();
        if inner.docs.contains_key(&doc.id) {
            return Err(BackendError::DuplicateId(doc.id));
        }
        if !inner.default_index_created {
            inner.indexes.insert("Default".to_string(), default_sort_suffix());
            inner.default_index_created = true;
        }
        inner.docs.insert(doc.id, doc);
        Ok(())
    }

    fn load_by_id(&self, id: Identifier) -> Option<StoredDoc> {
        self.inner.read().docs.get(&id).cloned()
    }

    fn scan(&self, filter: ScanFilter) -> Cursor {
        let inner = self.inner.read();
        let matches: Vec<StoredDoc> = inner.docs.values().filter(|d| filter.accepts(d)).cloned().collect();
        Cursor::new(matches, &filter.sort)
    }

    fn create_index(&self, spec: IndexSpec) -> Result<(), BackendError> {
        reject_reserved_index_name(&spec.name)?;
        let mut full_fields = spec.fields.clone();
        full_fields.extend(default_sort_suffix());
        let mut inner = self.inner.write();
        if let Some(existing) = inner.indexes.get(&spec.name) {
            if existing != &full_fields {
                return Err(BackendError::IndexOrderConflict { name: spec.name });
            }
            return Ok(());
        }
        inner.indexes.insert(spec.name, full_fields);
        Ok(())
    }
}

/// Registry of collections by name, one per backing root: each polymorphic
/// root type has one collection, named by CollectionRouter.
#[derive(Clone)]
pub struct MemoryBackend {
    root: Option<PathBuf>,
    collections: Arc<RwLock<HashMap<String, MemoryCollection>>>,
}

impl MemoryBackend {
    /// A pure in-memory backend with no on-disk persistence.
    pub fn in_memory() -> Self {
        Self { root: None, collections: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// A backend that persists each collection as `<root>/<name>.json`.
    pub fn at_path(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()), collections: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn collection(&self, name: &str) -> MemoryCollection {
        if let Some(existing) = self.collections.read().get(name).cloned() {
            return existing;
        }
        let mut w = self.collections.write();
        if let Some(existing) = w.get(name).cloned() {
            return existing;
        }
        let created = match &self.root {
            Some(root) => MemoryCollection::open_at(root, name).unwrap_or_else(|_| MemoryCollection::new()),
            None => MemoryCollection::new(),
        };
        w.insert(name.to_string(), created.clone());
        created
    }

    pub fn flush_all(&self) -> Result<(), BackendError> {
        for collection in self.collections.read().values() {
            collection.flush()?;
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
