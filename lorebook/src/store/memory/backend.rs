use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::document::Document;
use crate::errors::{ErrorKind, StoreError, StoreResult};
use crate::schema::{TableDef, VersionSpec};
use crate::store::memory::MemoryTable;
use crate::store::{current_time_millis, StorageBackend, StoreMetadata, Table};

/// In-memory implementation of the storage engine capability.
///
/// # Purpose
/// A complete [StorageBackend] suitable for testing and for callers that
/// do not need persistence. All data lives in memory; everything is lost
/// when the backend is dropped or closed.
///
/// # Atomicity
/// `apply_version` stages every change of one schema version — re-keyed
/// and transformed row maps, new table definitions — and validates the
/// staged state before committing anything. A failure at any step leaves
/// rows, definitions, and the persisted version exactly as they were, so
/// an aborted open never leaves the store half-migrated.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryBackendInner>,
}

impl MemoryBackend {
    /// Creates a fresh, never-persisted backend.
    pub fn new() -> Self {
        MemoryBackend {
            inner: Arc::new(MemoryBackendInner {
                closed: Arc::new(AtomicBool::new(false)),
                metadata: RwLock::new(None),
                tables: DashMap::new(),
            }),
        }
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(StoreError::new(
                "Store has already been closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        MemoryBackend::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn persisted_version(&self) -> StoreResult<Option<u32>> {
        self.check_open()?;
        Ok(self.inner.metadata.read().as_ref().map(|m| m.schema_version))
    }

    fn apply_version(&self, spec: &VersionSpec) -> StoreResult<()> {
        self.check_open()?;

        // Stage: (table name, definition, staged rows) for every table this
        // version touches. Nothing below mutates live state.
        let mut staged: Vec<(String, TableDef, IndexMap<String, Document>)> = Vec::new();

        for (name, definition) in spec.tables() {
            let rows = match self.inner.tables.get(name.as_str()) {
                Some(table) => {
                    MemoryTable::stage_definition(&table.rows_snapshot(), definition)?
                }
                None => IndexMap::new(),
            };
            staged.push((name.clone(), definition.clone(), rows));
        }

        if let Some(transform) = spec.transform() {
            let entry = staged
                .iter_mut()
                .find(|(name, _, _)| name == transform.table())
                .ok_or_else(|| {
                    StoreError::new(
                        &format!(
                            "Transform at version {} targets unknown table '{}'",
                            spec.version(),
                            transform.table()
                        ),
                        ErrorKind::MigrationError,
                    )
                })?;
            let (_, definition, rows) = entry;
            *rows = MemoryTable::stage_transform(rows, definition, transform).map_err(|e| {
                StoreError::new_with_cause(
                    &format!(
                        "Transform at version {} failed for table '{}'",
                        spec.version(),
                        transform.table()
                    ),
                    ErrorKind::MigrationError,
                    e,
                )
            })?;
        }

        // Commit: swap definitions and rows, then bump the version.
        for (name, definition, rows) in staged {
            let table = self
                .inner
                .tables
                .entry(name.clone())
                .or_insert_with(|| {
                    MemoryTable::new(&name, definition.clone(), self.inner.closed.clone())
                })
                .clone();
            table.commit(definition, rows);
        }

        let mut metadata = self.inner.metadata.write();
        let create_time = metadata.as_ref().map(|m| m.create_time);
        *metadata = Some(StoreMetadata {
            create_time: create_time.unwrap_or_else(current_time_millis),
            schema_version: spec.version(),
        });
        Ok(())
    }

    fn has_table(&self, name: &str) -> StoreResult<bool> {
        self.check_open()?;
        Ok(self.inner.tables.contains_key(name))
    }

    fn open_table(&self, name: &str) -> StoreResult<Table> {
        self.check_open()?;
        let table = self.inner.tables.get(name).ok_or_else(|| {
            StoreError::new(
                &format!("Table '{}' does not exist", name),
                ErrorKind::NotFound,
            )
        })?;
        Ok(Table::new(table.clone()))
    }

    fn is_closed(&self) -> StoreResult<bool> {
        Ok(self.inner.closed.load(Ordering::SeqCst))
    }

    fn close(&self) -> StoreResult<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryBackendInner {
    closed: Arc<AtomicBool>,
    metadata: RwLock<Option<StoreMetadata>>,
    tables: DashMap<String, MemoryTable>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{NAME_FIELD, THINGS_TABLE, UUID_FIELD};
    use crate::doc;
    use crate::schema::VersionTransform;

    fn spec(version: u32, transform: Option<VersionTransform>) -> VersionSpec {
        let mut registry = crate::schema::SchemaRegistry::new();
        let mut tables = IndexMap::new();
        tables.insert(
            THINGS_TABLE.to_string(),
            TableDef::new(&[UUID_FIELD, NAME_FIELD]),
        );
        registry.register(version, tables, transform).unwrap();
        registry.versions()[0].clone()
    }

    #[test]
    fn test_fresh_backend_has_no_version() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.persisted_version().unwrap(), None);
        assert!(!backend.has_table(THINGS_TABLE).unwrap());
    }

    #[test]
    fn test_apply_version_creates_tables_and_persists_version() {
        let backend = MemoryBackend::new();
        backend.apply_version(&spec(1, None)).unwrap();
        assert_eq!(backend.persisted_version().unwrap(), Some(1));
        assert!(backend.has_table(THINGS_TABLE).unwrap());
    }

    #[test]
    fn test_apply_version_runs_transform_over_existing_rows() {
        let backend = MemoryBackend::new();
        backend.apply_version(&spec(1, None)).unwrap();

        let things = backend.open_table(THINGS_TABLE).unwrap();
        things.put(doc! { uuid: "id-1", name: "Penelope" }).unwrap();

        let transform = VersionTransform::new(THINGS_TABLE, |mut r| {
            r.put("migrated", true)?;
            Ok(r)
        });
        backend.apply_version(&spec(2, Some(transform))).unwrap();

        let migrated = things.get("id-1").unwrap().unwrap();
        assert_eq!(migrated.get("migrated").as_bool(), Some(true));
        assert_eq!(backend.persisted_version().unwrap(), Some(2));
    }

    #[test]
    fn test_failed_transform_leaves_rows_and_version_untouched() {
        let backend = MemoryBackend::new();
        backend.apply_version(&spec(1, None)).unwrap();

        let things = backend.open_table(THINGS_TABLE).unwrap();
        things.put(doc! { uuid: "id-1", name: "Penelope" }).unwrap();

        let failing = VersionTransform::new(THINGS_TABLE, |_r| {
            Err(StoreError::new("boom", ErrorKind::IOError))
        });
        let result = backend.apply_version(&spec(2, Some(failing)));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::MigrationError);

        // last committed version and data survive
        assert_eq!(backend.persisted_version().unwrap(), Some(1));
        let row = things.get("id-1").unwrap().unwrap();
        assert!(row.get("migrated").is_null());
    }

    #[test]
    fn test_open_table_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let result = backend.open_table("missing");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::NotFound);
    }

    #[test]
    fn test_close_blocks_further_operations() {
        let backend = MemoryBackend::new();
        backend.apply_version(&spec(1, None)).unwrap();
        let things = backend.open_table(THINGS_TABLE).unwrap();

        backend.close().unwrap();
        assert!(backend.is_closed().unwrap());
        assert!(backend.persisted_version().is_err());
        assert!(things.scan().is_err());
    }

    #[test]
    fn test_create_time_is_kept_across_versions() {
        let backend = MemoryBackend::new();
        backend.apply_version(&spec(1, None)).unwrap();
        let first = backend.inner.metadata.read().clone().unwrap();
        backend.apply_version(&spec(2, None)).unwrap();
        let second = backend.inner.metadata.read().clone().unwrap();
        assert_eq!(first.create_time, second.create_time);
        assert_eq!(second.schema_version, 2);
    }
}
