//! Dataset name resolution and import-graph traversal.
//!
//! Dataset descriptors are themselves ordinary records, stored through
//! RecordStore in a reserved "catalog" collection, keyed by `name` within
//! their parent dataset. `LookupList` is the DFS expansion that every read
//! (ResolutionEngine, QueryPlanner) consults to know which datasets are
//! allowed to satisfy a request.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Map;

use crate::backend::{DocumentCollection, StoredDoc};
use crate::error::{StoreError, StoreResult};
use crate::identifier::{Identifier, IdentifierGenerator};
use crate::record::{DatasetDescriptor, RecordType};
use crate::resolution::ResolutionEngine;
use crate::store::RecordStore;

pub struct DatasetCatalog {
    store: RecordStore,
}

impl DatasetCatalog {
    pub fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        Self { store: RecordStore::new(collection) }
    }

    /// Resolve a dataset name to its Identifier within `parent`, or
    /// `StoreError::NotFound` if no such descriptor is visible.
    pub fn resolve(&self, name: &str, parent: Identifier, cutoff: Option<Identifier>) -> StoreResult<Identifier> {
        let mut registry = crate::record::TypeRegistry::new();
        registry.register::<DatasetDescriptor>();
        let engine = ResolutionEngine::new(&self.store, &registry);
        let lookup_list = vec![parent];
        match engine.resolve::<DatasetDescriptor>(name, &lookup_list, cutoff)? {
            Some((id, _)) => Ok(id),
            None => Err(StoreError::NotFound),
        }
    }

    /// Create a new dataset descriptor under `parent` with the given
    /// imports, enforcing dataset-id dominance and self-import invariants.
    pub fn create(
        &self,
        generator: &IdentifierGenerator,
        name: &str,
        parent: Identifier,
        imports: Vec<Identifier>,
    ) -> StoreResult<Identifier> {
        if name.is_empty() {
            return Err(StoreError::InvalidDataset { reason: "dataset name must not be empty".to_string() });
        }
        let id = generator.next()?;
        if id <= parent {
            return Err(StoreError::InvalidDataset {
                reason: format!("dataset id {} must be strictly greater than parent {}", id, parent),
            });
        }
        for import_id in &imports {
            if *import_id == id {
                return Err(StoreError::InvalidDataset { reason: "a dataset may not import itself".to_string() });
            }
            if *import_id >= id {
                return Err(StoreError::InvalidDataset {
                    reason: format!("dataset id {} must be strictly greater than imported dataset {}", id, import_id),
                });
            }
        }
        let descriptor = DatasetDescriptor { name: name.to_string(), imports, non_temporal: false };
        let payload = match serde_json::to_value(&descriptor).map_err(|e| StoreError::Internal(e.into()))? {
            serde_json::Value::Object(map) => map,
            _ => Map::new(),
        };
        let doc = StoredDoc {
            id,
            dataset: parent,
            key: name.to_string(),
            discriminator: crate::backend::DiscriminatorWire::Scalar(DatasetDescriptor::TYPE_NAME.to_string()),
            payload,
        };
        self.store.insert_unique(doc)?;
        Ok(id)
    }

    /// Resolve-then-create convenience: not a new invariant, just
    /// composition of the two operations above.
    pub fn get_or_create(
        &self,
        generator: &IdentifierGenerator,
        name: &str,
        parent: Identifier,
        imports: Vec<Identifier>,
    ) -> StoreResult<Identifier> {
        match self.resolve(name, parent, None) {
            Ok(id) => Ok(id),
            Err(StoreError::NotFound) => self.create(generator, name, parent, imports),
            Err(other) => Err(other),
        }
    }

    fn descriptor_at(&self, id: Identifier) -> StoreResult<Option<DatasetDescriptor>> {
        if id.is_empty() {
            return Ok(None);
        }
        match self.store.load_by_id(id) {
            None => Ok(None),
            Some(decoded) => {
                if decoded.is_tombstone() {
                    return Ok(None);
                }
                let mut registry = crate::record::TypeRegistry::new();
                registry.register::<DatasetDescriptor>();
                decoded.into_typed::<DatasetDescriptor>(&registry)
            }
        }
    }

    /// DFS expansion of `start`'s import chain into a deduplicated,
    /// cycle-free lookup list. Imports of a dataset whose descriptor is
    /// invisible under `cutoff` are not followed.
    pub fn lookup_list(&self, start: Identifier, cutoff: Option<Identifier>) -> StoreResult<Vec<Identifier>> {
        if start.is_empty() {
            return Ok(vec![Identifier::EMPTY]);
        }
        let mut result = Vec::new();
        let mut visited: HashSet<Identifier> = HashSet::new();
        self.visit(start, cutoff, &mut result, &mut visited)?;
        Ok(result)
    }

    fn visit(
        &self,
        dataset: Identifier,
        cutoff: Option<Identifier>,
        result: &mut Vec<Identifier>,
        visited: &mut HashSet<Identifier>,
    ) -> StoreResult<()> {
        if !visited.insert(dataset) {
            return Ok(());
        }
        result.push(dataset);
        if dataset.is_empty() {
            return Ok(());
        }
        if let Some(cutoff) = cutoff {
            if dataset > cutoff {
                // The descriptor itself is invisible; do not follow its imports.
                return Ok(());
            }
        }
        let descriptor = match self.descriptor_at(dataset)? {
            Some(d) => d,
            None => return Ok(()),
        };
        for import_id in descriptor.imports {
            self.visit(import_id, cutoff, result, visited)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod catalog_tests;
