use lorebook::common::THINGS_TABLE;
use lorebook::document::Document;
use lorebook::migration::MigrationDriver;
use lorebook::schema::{self, SchemaRegistry};
use lorebook::store::{MemoryBackend, Store};
use lorebook::{DataStore, DataStoreBuilder};

/// Returns the built-in schema history truncated at `version`, for
/// simulating a store created by an older release.
pub fn registry_up_to(version: u32) -> SchemaRegistry {
    let full = schema::history_registry().expect("Failed to build schema history");
    let mut registry = SchemaRegistry::new();
    for spec in full.versions().iter().filter(|s| s.version() <= version) {
        registry
            .register(spec.version(), spec.tables().clone(), spec.transform().cloned())
            .expect("Failed to truncate schema history");
    }
    registry
}

/// Creates a backend persisted at an old schema version with the given
/// legacy-shaped records already in its `things` table.
///
/// The records must satisfy the unique keys in force at that version
/// (`uuid` from v1, `uuid` and `name` from v2).
pub fn seeded_backend(version: u32, records: Vec<Document>) -> MemoryBackend {
    let backend = MemoryBackend::new();
    let store = Store::new(backend.clone());
    MigrationDriver::new(store.clone())
        .run(&registry_up_to(version))
        .expect("Failed to create legacy store");

    let things = store
        .open_table(THINGS_TABLE)
        .expect("Failed to open things table");
    for record in records {
        things.put(record).expect("Failed to seed legacy record");
    }
    backend
}

/// Opens a backend against the full built-in schema history.
pub fn open_latest(backend: MemoryBackend) -> DataStore {
    DataStoreBuilder::new()
        .backend(backend)
        .open()
        .expect("Failed to open store")
}
