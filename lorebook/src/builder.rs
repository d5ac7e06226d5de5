use crate::data_store::DataStore;
use crate::errors::StoreResult;
use crate::migration::MigrationDriver;
use crate::schema::{self, SchemaRegistry};
use crate::store::{MemoryBackend, StorageBackend, Store};

/// Fluent builder for opening a [DataStore].
///
/// # Purpose
/// Collects the storage backend and the schema registry, then runs the
/// migration sequence before handing out the accessor surface. Defaults
/// to an in-memory backend and the built-in schema history, so
/// `DataStoreBuilder::new().open()` yields a ready store at the latest
/// version.
///
/// # Example
/// ```rust
/// use lorebook::DataStoreBuilder;
///
/// let store = DataStoreBuilder::new().open().unwrap();
/// assert!(store.get_all_things().is_empty());
/// ```
pub struct DataStoreBuilder {
    store: Option<Store>,
    registry: Option<SchemaRegistry>,
}

impl DataStoreBuilder {
    pub fn new() -> Self {
        DataStoreBuilder {
            store: None,
            registry: None,
        }
    }

    /// Sets the storage backend. Defaults to [MemoryBackend].
    pub fn backend(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.store = Some(Store::new(backend));
        self
    }

    /// Sets the schema registry. Defaults to the built-in history.
    pub fn registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Opens the store: runs all pending migrations, then returns the
    /// accessor surface.
    ///
    /// # Errors
    /// `MigrationError` if the upgrade sequence fails or the persisted
    /// version is ahead of the registry; `NotFound` if the registry does
    /// not declare the core tables.
    pub fn open(self) -> StoreResult<DataStore> {
        let store = self
            .store
            .unwrap_or_else(|| Store::new(MemoryBackend::new()));
        let registry = match self.registry {
            Some(registry) => registry,
            None => schema::history_registry()?,
        };

        log::debug!(
            "Opening store against schema registry at version {}",
            registry.latest_version()
        );
        MigrationDriver::new(store.clone()).run(&registry)?;
        DataStore::new(store)
    }
}

impl Default for DataStoreBuilder {
    fn default() -> Self {
        DataStoreBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{KEY_VALUES_TABLE, THINGS_TABLE};
    use crate::errors::ErrorKind;

    #[test]
    fn test_default_open_reaches_latest_version() {
        let backend = MemoryBackend::new();
        let store = DataStoreBuilder::new()
            .backend(backend.clone())
            .open()
            .unwrap();
        drop(store);

        let latest = schema::history_registry().unwrap().latest_version();
        assert_eq!(backend.persisted_version().unwrap(), Some(latest));
        assert!(backend.has_table(THINGS_TABLE).unwrap());
        assert!(backend.has_table(KEY_VALUES_TABLE).unwrap());
    }

    #[test]
    fn test_reopen_same_backend_is_stable() {
        let backend = MemoryBackend::new();
        let first = DataStoreBuilder::new()
            .backend(backend.clone())
            .open()
            .unwrap();
        let thing = crate::thing::Thing::new("Penelope", "Npc");
        assert!(first.save_thing(&thing));
        drop(first);

        let second = DataStoreBuilder::new().backend(backend).open().unwrap();
        assert_eq!(second.get_all_things().len(), 1);
    }

    #[test]
    fn test_registry_without_core_tables_fails_open() {
        use crate::common::UUID_FIELD;
        use crate::schema::TableDef;
        use indexmap::IndexMap;

        let mut registry = SchemaRegistry::new();
        let mut tables = IndexMap::new();
        tables.insert("other".to_string(), TableDef::new(&[UUID_FIELD]));
        registry.register(1, tables, None).unwrap();

        let result = DataStoreBuilder::new().registry(registry).open();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::NotFound);
    }

    #[test]
    fn test_open_downgraded_registry_fails() {
        let backend = MemoryBackend::new();
        DataStoreBuilder::new()
            .backend(backend.clone())
            .open()
            .unwrap();

        // registry missing the later versions
        use crate::common::UUID_FIELD;
        use crate::schema::TableDef;
        use indexmap::IndexMap;
        let mut registry = SchemaRegistry::new();
        let mut tables = IndexMap::new();
        tables.insert(THINGS_TABLE.to_string(), TableDef::new(&[UUID_FIELD]));
        registry.register(1, tables, None).unwrap();

        let result = DataStoreBuilder::new()
            .backend(backend)
            .registry(registry)
            .open();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::MigrationError);
    }
}
