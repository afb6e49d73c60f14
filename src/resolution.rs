//! Single-record resolution: given `(key, lookup_list, cutoff)`, returns
//! exactly one winning version or null, and the strict load-by-id path
//! that errors rather than nulling on a type mismatch.

use std::collections::HashSet;

use crate::backend::ScanFilter;
use crate::error::{StoreError, StoreResult};
use crate::identifier::Identifier;
use crate::record::{RecordType, TypeRegistry};
use crate::store::RecordStore;

pub struct ResolutionEngine<'a> {
    store: &'a RecordStore,
    registry: &'a TypeRegistry,
}

impl<'a> ResolutionEngine<'a> {
    pub fn new(store: &'a RecordStore, registry: &'a TypeRegistry) -> Self {
        Self { store, registry }
    }

    /// Resolves `(key, lookup_list, cutoff)` to the winning record: the
    /// highest `(dataset, id)` pair visible under the lookup list and
    /// cutoff, or null if that row is a tombstone. Errors with
    /// `TypeMismatch` if the winning record's leaf type is not assignable
    /// to `T`, matching `load_or_null`'s strictness -- callers that want
    /// the query-style silent skip should use `QueryPlanner`.
    pub fn resolve<T: RecordType>(
        &self,
        key: &str,
        lookup_list: &[Identifier],
        cutoff: Option<Identifier>,
    ) -> StoreResult<Option<(Identifier, T)>> {
        let dataset_in: HashSet<Identifier> = lookup_list.iter().copied().collect();
        let filter = ScanFilter {
            key_eq: Some(key.to_string()),
            dataset_in: Some(dataset_in),
            cutoff,
            sort: vec![crate::backend::SortField::desc("dataset"), crate::backend::SortField::desc("id")],
            ..Default::default()
        };
        let mut cursor = self.store.collection().scan(filter);
        let batch = cursor.next_batch(1);
        let Some(winner) = batch.into_iter().next() else { return Ok(None) };
        if winner.is_tombstone() {
            return Ok(None);
        }
        let leaf = winner.discriminator.leaf();
        if !self.registry.is_assignable(leaf, T::TYPE_NAME) {
            return Err(StoreError::TypeMismatch { id: winner.id, requested: T::TYPE_NAME.to_string() });
        }
        let value: T = serde_json::from_value(serde_json::Value::Object(winner.payload))
            .map_err(|e| StoreError::Internal(e.into()))?;
        Ok(Some((winner.id, value)))
    }

    /// Load by identifier: errors on type mismatch, never silently
    /// returns null for it.
    pub fn load_or_null<T: RecordType>(&self, id: Identifier, cutoff: Option<Identifier>) -> StoreResult<Option<T>> {
        if let Some(cutoff) = cutoff {
            if id > cutoff {
                return Ok(None);
            }
        }
        let decoded = match self.store.load_by_id(id) {
            Some(d) => d,
            None => return Ok(None),
        };
        if decoded.is_tombstone() {
            return Ok(None);
        }
        decoded.into_typed::<T>(self.registry)
    }
}

#[cfg(test)]
#[path = "resolution_tests.rs"]
mod resolution_tests;
