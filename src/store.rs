//! Low-level insert/load by identifier, polymorphic decode, and tombstone
//! handling. Wraps one backing `DocumentCollection`.

use std::sync::Arc;

use serde_json::Map;

use crate::backend::{
    BackendError, DocumentCollection, IndexSpec, SortField, StoredDoc,
};
use crate::error::{StoreError, StoreResult};
use crate::identifier::Identifier;
use crate::record::{RecordType, TypeRegistry};

/// A record decoded from the base view: either tombstoned or holding a
/// still-typed JSON payload plus its discriminator chain.
#[derive(Debug, Clone)]
pub enum Decoded {
    Tombstone { id: Identifier, dataset: Identifier, key: String },
    Data { id: Identifier, dataset: Identifier, key: String, type_name: String, payload: Map<String, serde_json::Value> },
}

impl Decoded {
    pub fn id(&self) -> Identifier {
        match self {
            Decoded::Tombstone { id, .. } => *id,
            Decoded::Data { id, .. } => *id,
        }
    }

    pub fn dataset(&self) -> Identifier {
        match self {
            Decoded::Tombstone { dataset, .. } => *dataset,
            Decoded::Data { dataset, .. } => *dataset,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Decoded::Tombstone { .. })
    }

    fn from_stored(doc: StoredDoc) -> Self {
        if doc.is_tombstone() {
            Decoded::Tombstone { id: doc.id, dataset: doc.dataset, key: doc.key }
        } else {
            Decoded::Data {
                id: doc.id,
                dataset: doc.dataset,
                key: doc.key,
                type_name: doc.discriminator.leaf().to_string(),
                payload: doc.payload,
            }
        }
    }

    /// Decode into a concrete type if its leaf discriminator is assignable
    /// to `T::TYPE_NAME` per the type registry. Errors rather than
    /// returning `None` on a type mismatch -- callers that want a silent
    /// skip go through `QueryPlanner` instead.
    pub fn into_typed<T: RecordType>(self, registry: &TypeRegistry) -> StoreResult<Option<T>> {
        match self {
            Decoded::Tombstone { .. } => Ok(None),
            Decoded::Data { id, type_name, payload, .. } => {
                if !registry.is_assignable(&type_name, T::TYPE_NAME) {
                    return Err(StoreError::TypeMismatch { id, requested: T::TYPE_NAME.to_string() });
                }
                let value = serde_json::Value::Object(payload);
                let typed: T = serde_json::from_value(value).map_err(|e| StoreError::Internal(e.into()))?;
                Ok(Some(typed))
            }
        }
    }
}

/// Wraps one backing collection. `base` is the untyped view used for
/// iteration (any subtype decodes); `create_user_index`/`create_default_index`
/// operate on the same underlying collection, since this crate emulates the
/// typed view as base-view-plus-predicate rather than a second physical view.
#[derive(Clone)]
pub struct RecordStore {
    collection: Arc<dyn DocumentCollection>,
}

impl RecordStore {
    pub fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Arc<dyn DocumentCollection> {
        &self.collection
    }

    pub fn insert_unique(&self, doc: StoredDoc) -> StoreResult<()> {
        self.collection.insert_unique(doc).map_err(|e| match e {
            BackendError::DuplicateId(id) => StoreError::DuplicateId { id },
            other => StoreError::Internal(other.into()),
        })
    }

    pub fn load_by_id(&self, id: Identifier) -> Option<Decoded> {
        self.collection.load_by_id(id).map(Decoded::from_stored)
    }

    /// Insert a tombstone for `key` in `dataset`, carrying `id`.
    pub fn insert_tombstone(&self, id: Identifier, dataset: Identifier, key: String) -> StoreResult<()> {
        self.insert_unique(StoredDoc::tombstone(id, dataset, key))
    }

    /// Creates the default index `(key ASC, dataset DESC, id DESC)`. Safe to
    /// call repeatedly; the backend creates it lazily at first insert too.
    pub fn create_default_index(&self) -> StoreResult<()> {
        self.collection
            .create_index(IndexSpec { name: "Default".to_string(), fields: vec![] })
            .map(|_| ())
            .or_else(|e| match e {
                BackendError::ReservedIndexName(_) => Ok(()),
                other => Err(StoreError::Internal(other.into())),
            })
    }

    pub fn create_user_index(&self, name: &str, fields: Vec<SortField>) -> StoreResult<()> {
        self.collection
            .create_index(IndexSpec { name: name.to_string(), fields })
            .map_err(|e| match e {
                BackendError::ReservedIndexName(n) => StoreError::ReservedIndexName(n),
                BackendError::IndexOrderConflict { name } => StoreError::IndexOrderConflict { name },
                other => StoreError::Internal(other.into()),
            })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
