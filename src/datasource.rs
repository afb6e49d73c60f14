//! The public facade: `Save`, `Delete`, `LoadOrNull`, `GetQuery`,
//! `DropDatabase`, owning the cutoff/readonly state machine and wiring
//! together the Identifier generator, dataset catalog, collection router
//! and backing collections.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::backend::memory::MemoryBackend;
use crate::backend::{DiscriminatorConvention, DiscriminatorWire, DocumentCollection, StoredDoc};
use crate::catalog::DatasetCatalog;
use crate::config::{validate_database_name, DataSourceOptions, DataStoreDescriptor};
use crate::error::{StoreError, StoreResult};
use crate::identifier::{Identifier, IdentifierGenerator};
use crate::query::Query;
use crate::record::{RecordType, TypeRegistry};
use crate::resolution::ResolutionEngine;
use crate::store::RecordStore;

/// Lifecycle stage. `Uninitialized` only exists before `DataSource::new`
/// returns; once constructed a DataSource is always at least `Initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initialized,
    ReadOnly,
    Disposed,
}

const CATALOG_COLLECTION: &str = "__DatasetCatalog__";

struct Inner {
    name: String,
    options: DataSourceOptions,
    generator: IdentifierGenerator,
    backend: MemoryBackend,
    catalog: DatasetCatalog,
    registry: RwLock<TypeRegistry>,
    state: RwLock<State>,
    cutoff: RwLock<Option<Identifier>>,
}

/// Thread-safe, `Clone`-cheap handle onto one temporal store instance,
/// sharable across threads.
#[derive(Clone)]
pub struct DataSource {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("name", &self.inner.name)
            .field("state", &*self.inner.state.read())
            .field("cutoff", &*self.inner.cutoff.read())
            .finish()
    }
}

impl DataSource {
    /// Constructs a DataSource against `name` (validated against the
    /// forbidden-character set and length limit) with the given options. If
    /// `options.cutoff` is set, the instance starts directly in the
    /// `ReadOnly` state.
    pub fn new(name: &str, options: DataSourceOptions) -> StoreResult<Self> {
        validate_database_name(name).map_err(|reason| StoreError::InvalidDataset { reason })?;

        let backend = match &options.data_store {
            DataStoreDescriptor::InMemory => MemoryBackend::in_memory(),
            DataStoreDescriptor::OnDisk { root } => MemoryBackend::at_path(root.clone()),
        };
        let catalog_collection: Arc<dyn DocumentCollection> = Arc::new(backend.collection(CATALOG_COLLECTION));
        let catalog = DatasetCatalog::new(catalog_collection);

        let cutoff = options.cutoff;
        let state = if cutoff.is_some() { State::ReadOnly } else { State::Initialized };

        info!(target: "temporal_store::datasource", name, instance_type = %options.instance_type, "data source initialized");

        Ok(Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                options,
                generator: IdentifierGenerator::new(),
                backend,
                catalog,
                registry: RwLock::new(TypeRegistry::new()),
                state: RwLock::new(state),
                cutoff: RwLock::new(cutoff),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Registers a concrete record subtype so the resolution/query engines
    /// can decide its assignability to ancestor types (see record.rs).
    pub fn register_type<T: RecordType>(&self) {
        self.inner.registry.write().register::<T>();
    }

    pub fn cutoff(&self) -> Option<Identifier> {
        *self.inner.cutoff.read()
    }

    pub fn is_read_only(&self) -> bool {
        matches!(*self.inner.state.read(), State::ReadOnly)
    }

    pub fn is_disposed(&self) -> bool {
        matches!(*self.inner.state.read(), State::Disposed)
    }

    /// Transitions `Initialized -> ReadOnly` (one-way until cleared), fixing
    /// the as-of point for every subsequent read and rejecting every
    /// subsequent write.
    pub fn set_cutoff(&self, cutoff: Identifier) -> StoreResult<()> {
        let mut state = self.inner.state.write();
        if *state == State::Disposed {
            return Err(StoreError::ReadOnlyViolation { operation: "set_cutoff".to_string() });
        }
        *self.inner.cutoff.write() = Some(cutoff);
        *state = State::ReadOnly;
        self.inner.generator.set_read_only(true);
        Ok(())
    }

    /// Clears the cutoff, transitioning `ReadOnly -> Initialized` and
    /// re-enabling writes.
    pub fn clear_cutoff(&self) -> StoreResult<()> {
        let mut state = self.inner.state.write();
        if *state == State::Disposed {
            return Err(StoreError::ReadOnlyViolation { operation: "clear_cutoff".to_string() });
        }
        *self.inner.cutoff.write() = None;
        *state = State::Initialized;
        self.inner.generator.set_read_only(false);
        Ok(())
    }

    /// Permanently retires this DataSource. All further operations fail.
    pub fn dispose(&self) {
        *self.inner.state.write() = State::Disposed;
        self.inner.generator.set_read_only(true);
    }

    fn check_writable(&self, operation: &str) -> StoreResult<()> {
        match *self.inner.state.read() {
            State::Initialized => Ok(()),
            State::ReadOnly | State::Disposed => Err(StoreError::ReadOnlyViolation { operation: operation.to_string() }),
        }
    }

    fn check_usable(&self, operation: &str) -> StoreResult<()> {
        if self.is_disposed() {
            return Err(StoreError::ReadOnlyViolation { operation: operation.to_string() });
        }
        Ok(())
    }

    fn record_store_for(&self, root_name: &str) -> RecordStore {
        let collection_name = self.inner.options.router.collection_for(root_name, None);
        let collection: Arc<dyn DocumentCollection> = Arc::new(self.inner.backend.collection(&collection_name));
        RecordStore::new(collection)
    }

    fn discriminator_for<T: RecordType>(&self) -> DiscriminatorWire {
        match self.inner.options.discriminator {
            DiscriminatorConvention::Scalar => DiscriminatorWire::Scalar(T::TYPE_NAME.to_string()),
            DiscriminatorConvention::Hierarchical => DiscriminatorWire::Hierarchical(T::full_chain()),
        }
    }

    /// Save `record` into `dataset`, minting a fresh `id`. Any prior
    /// `id`/`dataset` the caller's value carried is ignored: the wire shape
    /// is reassembled entirely from `id`, `dataset`, `key`, and the
    /// record's own serialized fields.
    pub fn save<T: RecordType>(&self, record: &T, dataset: Identifier, key: &str) -> StoreResult<Identifier> {
        self.check_writable("save")?;
        if key.is_empty() {
            return Err(StoreError::InvalidDataset { reason: "record key must not be empty".to_string() });
        }
        let id = self.inner.generator.next()?;
        if id <= dataset {
            return Err(StoreError::InvalidDataset {
                reason: format!("record id {} must be strictly greater than dataset {}", id, dataset),
            });
        }
        let payload = match serde_json::to_value(record).map_err(|e| StoreError::Internal(e.into()))? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        let doc = StoredDoc { id, dataset, key: key.to_string(), discriminator: self.discriminator_for::<T>(), payload };
        let store = self.record_store_for(T::root_name());
        store.insert_unique(doc)?;
        Ok(id)
    }

    /// Writes a tombstone for `key` in `dataset`, even if no live record
    /// currently exists for it.
    pub fn delete(&self, root_name: &str, key: &str, dataset: Identifier) -> StoreResult<Identifier> {
        self.check_writable("delete")?;
        let id = self.inner.generator.next()?;
        if id <= dataset {
            return Err(StoreError::InvalidDataset {
                reason: format!("tombstone id {} must be strictly greater than dataset {}", id, dataset),
            });
        }
        let store = self.record_store_for(root_name);
        store.insert_tombstone(id, dataset, key.to_string())?;
        Ok(id)
    }

    /// Load by identifier: errors with `TypeMismatch` rather than returning
    /// `None` if the stored subtype is not assignable to `T`.
    pub fn load_by_id<T: RecordType>(&self, id: Identifier) -> StoreResult<Option<T>> {
        self.check_usable("load_by_id")?;
        let store = self.record_store_for(T::root_name());
        let registry = self.inner.registry.read();
        let engine = ResolutionEngine::new(&store, &registry);
        engine.load_or_null::<T>(id, self.cutoff())
    }

    /// Resolve `key` within `dataset`'s import-graph lookup list to its
    /// latest visible version.
    pub fn load_by_key<T: RecordType>(&self, key: &str, dataset: Identifier) -> StoreResult<Option<T>> {
        self.check_usable("load_by_key")?;
        let cutoff = self.cutoff();
        let lookup_list = self.inner.catalog.lookup_list(dataset, cutoff)?;
        let store = self.record_store_for(T::root_name());
        let registry = self.inner.registry.read();
        let engine = ResolutionEngine::new(&store, &registry);
        Ok(engine.resolve::<T>(key, &lookup_list, cutoff)?.map(|(_, value)| value))
    }

    /// Returns a query builder scoped to `dataset`'s lookup list, ready for
    /// `.filter(...)`/`.sort_by(...)`/`.run()`.
    pub fn get_query<T: RecordType>(&self, dataset: Identifier) -> StoreResult<Query<T>> {
        self.check_usable("get_query")?;
        let cutoff = self.cutoff();
        let lookup_list = self.inner.catalog.lookup_list(dataset, cutoff)?;
        let store = self.record_store_for(T::root_name());
        let registry = self.inner.registry.read().clone();
        Ok(Query::new(store, registry, lookup_list, cutoff, self.inner.options.freeze_imports))
    }

    /// Resolve a dataset name to its Identifier within `parent`.
    pub fn resolve_dataset(&self, name: &str, parent: Identifier) -> StoreResult<Identifier> {
        self.check_usable("resolve_dataset")?;
        self.inner.catalog.resolve(name, parent, self.cutoff())
    }

    /// Create a new dataset under `parent`.
    pub fn create_dataset(&self, name: &str, parent: Identifier, imports: Vec<Identifier>) -> StoreResult<Identifier> {
        self.check_writable("create_dataset")?;
        self.inner.catalog.create(&self.inner.generator, name, parent, imports)
    }

    /// Resolve-then-create convenience.
    pub fn get_or_create_dataset(&self, name: &str, parent: Identifier, imports: Vec<Identifier>) -> StoreResult<Identifier> {
        self.check_writable("get_or_create_dataset")?;
        self.inner.catalog.get_or_create(&self.inner.generator, name, parent, imports)
    }

    /// Admin-gated drop: fails with `UnsafeDrop` outside `Dev`/`User`/`Test`
    /// instance types.
    pub fn drop_database(&self) -> StoreResult<()> {
        if !self.inner.options.instance_type.allows_drop() {
            return Err(StoreError::UnsafeDrop { instance_type: self.inner.options.instance_type.to_string() });
        }
        self.check_writable("drop_database")?;
        self.inner.backend.flush_all().map_err(|e| StoreError::Internal(e.into()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "datasource_tests.rs"]
mod datasource_tests;
