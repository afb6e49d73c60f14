//! The backing-store contract: unique-by-id inserts, filtered+sorted
//! streaming reads with explicit batch boundaries, and server-side index
//! creation. `memory` ships the crate's one concrete implementation: an
//! in-process KV registry -- a `parking_lot`-guarded map with an optional
//! JSON snapshot to disk.

pub mod memory;

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::identifier::Identifier;

/// The wire discriminator convention fixed at DataSource construction.
/// Controls only how `_t` is represented; assignability itself is always
/// resolved through the `TypeRegistry` (see record.rs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorConvention {
    Scalar,
    Hierarchical,
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiscriminatorWire {
    Scalar(String),
    Hierarchical(Vec<String>),
}

impl DiscriminatorWire {
    pub fn leaf(&self) -> &str {
        match self {
            DiscriminatorWire::Scalar(s) => s.as_str(),
            DiscriminatorWire::Hierarchical(chain) => chain.last().map(|s| s.as_str()).unwrap_or(""),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.leaf() == crate::record::TOMBSTONE_DISCRIMINATOR
    }
}

/// A record as physically stored: base fields plus the raw discriminator
/// and JSON payload. Decoding into a concrete `RecordType` happens above
/// this layer (RecordStore), keeping the base-view / typed-view split.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDoc {
    pub id: Identifier,
    pub dataset: Identifier,
    pub key: String,
    pub discriminator: DiscriminatorWire,
    pub payload: Map<String, Value>,
}

impl StoredDoc {
    pub fn is_tombstone(&self) -> bool {
        self.discriminator.is_tombstone()
    }

    pub fn tombstone(id: Identifier, dataset: Identifier, key: String) -> Self {
        Self {
            id,
            dataset,
            key,
            discriminator: DiscriminatorWire::Scalar(crate::record::TOMBSTONE_DISCRIMINATOR.to_string()),
            payload: Map::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("record with id {0} already exists")]
    DuplicateId(Identifier),
    #[error("index name '{0}' is reserved")]
    ReservedIndexName(String),
    #[error("index '{name}' already exists with a different field order")]
    IndexOrderConflict { name: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A single field-ordering entry in an index or sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub ascending: bool,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), ascending: true }
    }
    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), ascending: false }
    }
}

/// The default index's trailing suffix, appended by RecordStore to every
/// user index and used verbatim as the scan ordering for resolution and
/// query Stage B.
pub fn default_sort_suffix() -> Vec<SortField> {
    vec![SortField::asc("key"), SortField::desc("dataset"), SortField::desc("id")]
}

#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: String,
    pub fields: Vec<SortField>,
}

/// A leaf-level comparison used by Stage A's typed probe. Deliberately
/// small: this crate's query surface is a programmatic filter builder over
/// typed fields, not a SQL front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Ge(String, Value),
    Lt(String, Value),
    Le(String, Value),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn matches(&self, payload: &Map<String, Value>) -> bool {
        match self {
            Predicate::Eq(field, v) => payload.get(field) == Some(v),
            Predicate::Ne(field, v) => payload.get(field) != Some(v),
            Predicate::Gt(field, v) => compare_json(payload.get(field), v) == Some(std::cmp::Ordering::Greater),
            Predicate::Ge(field, v) => {
                matches!(compare_json(payload.get(field), v), Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal))
            }
            Predicate::Lt(field, v) => compare_json(payload.get(field), v) == Some(std::cmp::Ordering::Less),
            Predicate::Le(field, v) => {
                matches!(compare_json(payload.get(field), v), Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal))
            }
            Predicate::And(a, b) => a.matches(payload) && b.matches(payload),
            Predicate::Or(a, b) => a.matches(payload) || b.matches(payload),
        }
    }
}

fn compare_json(lhs: Option<&Value>, rhs: &Value) -> Option<std::cmp::Ordering> {
    match (lhs?, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Constrains a scan to a subset of the collection, mirroring the
/// parameters ResolutionEngine and QueryPlanner apply before sorting.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub key_eq: Option<String>,
    pub key_in: Option<HashSet<String>>,
    pub dataset_in: Option<HashSet<Identifier>>,
    pub cutoff: Option<Identifier>,
    /// Restricts a scan to records whose leaf discriminator is one of
    /// these names -- the "typed view", generalized to the full set of
    /// subtypes assignable to the requested type rather than a single
    /// exact discriminator.
    pub type_in: Option<HashSet<String>>,
    pub predicate: Option<Predicate>,
    pub sort: Vec<SortField>,
}

impl ScanFilter {
    pub(crate) fn accepts(&self, doc: &StoredDoc) -> bool {
        if let Some(k) = &self.key_eq {
            if &doc.key != k {
                return false;
            }
        }
        if let Some(ks) = &self.key_in {
            if !ks.contains(&doc.key) {
                return false;
            }
        }
        if let Some(ds) = &self.dataset_in {
            if !ds.contains(&doc.dataset) {
                return false;
            }
        }
        if let Some(cutoff) = &self.cutoff {
            if doc.id > *cutoff {
                return false;
            }
        }
        if let Some(type_in) = &self.type_in {
            if doc.is_tombstone() || !type_in.contains(doc.discriminator.leaf()) {
                return false;
            }
        }
        if let Some(pred) = &self.predicate {
            if !pred.matches(&doc.payload) {
                return false;
            }
        }
        true
    }
}

fn field_value(doc: &StoredDoc, field: &str) -> Value {
    match field {
        "key" => Value::String(doc.key.clone()),
        "dataset" => Value::String(doc.dataset.to_hex()),
        "id" => Value::String(doc.id.to_hex()),
        other => doc.payload.get(other).cloned().unwrap_or(Value::Null),
    }
}

fn compare_for_sort(a: &StoredDoc, b: &StoredDoc, sort: &[SortField]) -> std::cmp::Ordering {
    for field in sort {
        let ord = match field.field.as_str() {
            "id" => a.id.cmp(&b.id),
            "dataset" => a.dataset.cmp(&b.dataset),
            "key" => a.key.cmp(&b.key),
            other => {
                let av = field_value(a, other);
                let bv = field_value(b, other);
                compare_json(Some(&av), &bv).unwrap_or(std::cmp::Ordering::Equal)
            }
        };
        let ord = if field.ascending { ord } else { ord.reverse() };
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    std::cmp::Ordering::Equal
}

/// A batched, pausable view over a scan's matches. Callers pull one batch
/// at a time and may check a cancellation flag between calls, bounding
/// memory use on large result sets.
pub struct Cursor {
    remaining: std::vec::IntoIter<StoredDoc>,
}

impl Cursor {
    pub(crate) fn new(mut docs: Vec<StoredDoc>, sort: &[SortField]) -> Self {
        docs.sort_by(|a, b| compare_for_sort(a, b, sort));
        Self { remaining: docs.into_iter() }
    }

    /// Pull up to `batch_size` documents. An empty result means the cursor
    /// is exhausted.
    pub fn next_batch(&mut self, batch_size: usize) -> Vec<StoredDoc> {
        let mut out = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            match self.remaining.next() {
                Some(doc) => out.push(doc),
                None => break,
            }
        }
        out
    }
}

/// The backing-store contract a document collection must satisfy.
pub trait DocumentCollection: Send + Sync {
    fn insert_unique(&self, doc: StoredDoc) -> Result<(), BackendError>;
    fn load_by_id(&self, id: Identifier) -> Option<StoredDoc>;
    fn scan(&self, filter: ScanFilter) -> Cursor;
    fn create_index(&self, spec: IndexSpec) -> Result<(), BackendError>;
}

pub(crate) fn reject_reserved_index_name(name: &str) -> Result<(), BackendError> {
    if name.eq_ignore_ascii_case("key") || name.eq_ignore_ascii_case("default") {
        return Err(BackendError::ReservedIndexName(name.to_string()));
    }
    Ok(())
}
