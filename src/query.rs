//! The two-stage batched query pipeline: Stage A runs the caller's filter
//! against the typed view in batches of keys; Stage B re-resolves each
//! batch's keys against the base view under the same temporal rules
//! ResolutionEngine uses, so a query can never return a superseded or
//! wrongly-typed version of a key.

use std::collections::HashSet;
use std::marker::PhantomData;

use crate::backend::{Predicate, ScanFilter, SortField};
use crate::error::{StoreError, StoreResult};
use crate::identifier::Identifier;
use crate::record::{RecordType, TypeRegistry};
use crate::store::RecordStore;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A fluent filter+sort builder. A filter must precede any sort; multiple
/// `sort_by` calls compose primary->secondary in declaration order. The
/// planner appends `(key ASC, dataset DESC, id DESC)` itself -- callers
/// must not supply it.
pub struct Query<T: RecordType> {
    store: RecordStore,
    registry: TypeRegistry,
    lookup_list: Vec<Identifier>,
    cutoff: Option<Identifier>,
    freeze_imports: bool,
    filter: Option<Predicate>,
    sort: Vec<SortField>,
    batch_size: usize,
    _marker: PhantomData<T>,
}

impl<T: RecordType> Query<T> {
    pub(crate) fn new(
        store: RecordStore,
        registry: TypeRegistry,
        lookup_list: Vec<Identifier>,
        cutoff: Option<Identifier>,
        freeze_imports: bool,
    ) -> Self {
        Self {
            store,
            registry,
            lookup_list,
            cutoff,
            freeze_imports,
            filter: None,
            sort: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            _marker: PhantomData,
        }
    }

    /// Accumulate a filter predicate. Must be called at least once before
    /// `sort_by`.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => Predicate::And(Box::new(existing), Box::new(predicate)),
            None => predicate,
        });
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, ascending: bool) -> StoreResult<Self> {
        if self.filter.is_none() {
            return Err(StoreError::InvalidQuery { reason: "sort_by was called before any filter() call".to_string() });
        }
        self.sort.push(SortField { field: field.into(), ascending });
        Ok(self)
    }

    #[cfg(test)]
    pub(crate) fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Execute the two-stage pipeline and return every winning record in
    /// the caller's declared sort order.
    pub fn run(&self) -> StoreResult<Vec<(Identifier, T)>> {
        let type_in = self.registry.leaves_assignable_to(T::TYPE_NAME);

        let dataset_in: HashSet<Identifier> = self.lookup_list.iter().copied().collect();

        let mut stage_a_sort = self.sort.clone();
        stage_a_sort.push(SortField::asc("key"));
        stage_a_sort.push(SortField::desc("dataset"));
        stage_a_sort.push(SortField::desc("id"));

        let stage_a_filter = ScanFilter {
            dataset_in: Some(dataset_in.clone()),
            cutoff: self.cutoff,
            type_in: Some(type_in),
            predicate: self.filter.clone(),
            sort: stage_a_sort,
            ..Default::default()
        };

        let mut cursor = self.store.collection().scan(stage_a_filter);
        let mut results: Vec<(Identifier, T)> = Vec::new();

        loop {
            let batch = cursor.next_batch(self.batch_size);
            if batch.is_empty() {
                break;
            }
            let batch_keys: HashSet<String> = batch.iter().map(|d| d.key.clone()).collect();
            let batch_ids: HashSet<Identifier> = batch.iter().map(|d| d.id).collect();
            let batch_order: Vec<String> = {
                let mut seen = HashSet::new();
                batch.iter().filter(|d| seen.insert(d.key.clone())).map(|d| d.key.clone()).collect()
            };

            let stage_b_filter = ScanFilter {
                key_in: Some(batch_keys),
                dataset_in: Some(dataset_in.clone()),
                cutoff: self.cutoff,
                sort: vec![SortField::asc("key"), SortField::desc("dataset"), SortField::desc("id")],
                ..Default::default()
            };
            let mut stage_b_cursor = self.store.collection().scan(stage_b_filter);
            let mut winners: std::collections::HashMap<String, crate::backend::StoredDoc> = std::collections::HashMap::new();
            loop {
                let stage_b_batch = stage_b_cursor.next_batch(self.batch_size);
                if stage_b_batch.is_empty() {
                    break;
                }
                for doc in stage_b_batch {
                    winners.entry(doc.key.clone()).or_insert(doc);
                }
            }

            for key in batch_order {
                let Some(winner) = winners.get(&key) else { continue };
                if winner.is_tombstone() {
                    continue;
                }
                if !batch_ids.contains(&winner.id) {
                    continue;
                }
                let leaf = winner.discriminator.leaf();
                if !self.registry.is_assignable(leaf, T::TYPE_NAME) {
                    continue;
                }
                if self.freeze_imports && !freeze_imports_visible(winner, &self.lookup_list) {
                    continue;
                }
                let value: T = match serde_json::from_value(serde_json::Value::Object(winner.payload.clone())) {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                results.push((winner.id, value));
            }
        }
        Ok(results)
    }
}

/// Freeze-imports visibility rule: walking the lookup list in descending
/// Identifier order, the first entry equal to the record's dataset
/// validates it; an earlier entry strictly less than the record's id
/// invalidates it.
pub(crate) fn freeze_imports_visible(doc: &crate::backend::StoredDoc, lookup_list: &[Identifier]) -> bool {
    let mut ordered: Vec<Identifier> = lookup_list.to_vec();
    ordered.sort_by(|a, b| b.cmp(a));
    for entry in ordered {
        if entry == doc.dataset {
            return true;
        }
        if entry < doc.id {
            return false;
        }
    }
    false
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod query_tests;
