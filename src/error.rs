//! Unified error taxonomy for the temporal store.
//!
//! One enum, one `Result` alias, used across every component (Identifier,
//! DatasetCatalog, RecordStore, ResolutionEngine, QueryPlanner, DataSource).
//! A monotonicity collision during identifier generation deliberately has
//! no variant here: it is recovered locally and logged, never surfaced to
//! the caller.

use thiserror::Error;

use crate::identifier::Identifier;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record found")]
    NotFound,

    #[error("record {id} does not match requested type {requested}")]
    TypeMismatch { id: Identifier, requested: String },

    #[error("record with id {id} already exists")]
    DuplicateId { id: Identifier },

    #[error("operation '{operation}' rejected: data source is read-only")]
    ReadOnlyViolation { operation: String },

    #[error("invalid dataset: {reason}")]
    InvalidDataset { reason: String },

    #[error("index name '{0}' is reserved")]
    ReservedIndexName(String),

    #[error("index '{name}' already exists with a different field order")]
    IndexOrderConflict { name: String },

    #[error("DropDatabase is not permitted for instance type {instance_type}")]
    UnsafeDrop { instance_type: String },

    #[error("query is malformed: {reason}")]
    InvalidQuery { reason: String },

    #[error("operation timed out")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
