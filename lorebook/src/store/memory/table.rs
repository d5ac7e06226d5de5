use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::Value;
use crate::document::Document;
use crate::errors::{ErrorKind, StoreError, StoreResult};
use crate::schema::{TableDef, VersionTransform};
use crate::store::TableProvider;

/// In-memory table of records.
///
/// # Purpose
/// Stores documents keyed by the value of the table's primary key (the
/// first declared unique key), preserving insertion order for full scans.
/// Every write enforces all declared unique keys.
///
/// # Characteristics
/// - **Thread-Safe**: rows behind a `parking_lot::RwLock`, clone-able handle
/// - **Insertion Order**: `IndexMap` backing keeps storage order for scans
/// - **Unique Keys**: duplicate checks by linear scan; record counts in
///   this store are small
#[derive(Clone)]
pub struct MemoryTable {
    inner: Arc<MemoryTableInner>,
}

impl MemoryTable {
    /// Creates an empty table with the given definition.
    ///
    /// # Arguments
    /// * `name` - The table name
    /// * `definition` - Unique/secondary key declaration
    /// * `closed` - Closed flag shared with the owning backend
    pub(crate) fn new(name: &str, definition: TableDef, closed: Arc<AtomicBool>) -> Self {
        MemoryTable {
            inner: Arc::new(MemoryTableInner {
                name: name.to_string(),
                definition: RwLock::new(definition),
                rows: RwLock::new(IndexMap::new()),
                closed,
            }),
        }
    }

    /// Replaces this table's rows and definition in one step.
    ///
    /// Used by the backend to commit a staged migration unit; callers must
    /// have validated the staged rows against the definition.
    pub(crate) fn commit(&self, definition: TableDef, rows: IndexMap<String, Document>) {
        let mut def_guard = self.inner.definition.write();
        let mut row_guard = self.inner.rows.write();
        *def_guard = definition;
        *row_guard = rows;
    }

    /// Returns a snapshot of the current rows.
    pub(crate) fn rows_snapshot(&self) -> IndexMap<String, Document> {
        self.inner.rows.read().clone()
    }

    /// Applies a transform to every row of a snapshot, re-keying by the
    /// definition's primary key and re-validating every unique key.
    ///
    /// Pure staging: the live rows are not touched. The caller commits the
    /// returned map only once the whole migration unit has succeeded.
    pub(crate) fn stage_transform(
        rows: &IndexMap<String, Document>,
        definition: &TableDef,
        transform: &VersionTransform,
    ) -> StoreResult<IndexMap<String, Document>> {
        let mut staged = IndexMap::with_capacity(rows.len());
        for record in rows.values() {
            let rewritten = transform.apply(record.clone())?;
            let key = primary_key_value(&rewritten, definition)?;
            if staged.insert(key, rewritten).is_some() {
                return Err(StoreError::new(
                    &format!(
                        "Transform produced duplicate primary key in table '{}'",
                        transform.table()
                    ),
                    ErrorKind::UniqueConstraintViolation,
                ));
            }
        }
        validate_unique_keys(&staged, definition)?;
        Ok(staged)
    }

    /// Re-keys a row snapshot under a new definition and validates it.
    pub(crate) fn stage_definition(
        rows: &IndexMap<String, Document>,
        definition: &TableDef,
    ) -> StoreResult<IndexMap<String, Document>> {
        let mut staged = IndexMap::with_capacity(rows.len());
        for record in rows.values() {
            let key = primary_key_value(record, definition)?;
            if staged.insert(key, record.clone()).is_some() {
                return Err(StoreError::new(
                    "Existing rows violate the new primary key",
                    ErrorKind::UniqueConstraintViolation,
                ));
            }
        }
        validate_unique_keys(&staged, definition)?;
        Ok(staged)
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(StoreError::new(
                &format!("Table '{}' belongs to a closed store", self.inner.name),
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }
}

impl TableProvider for MemoryTable {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn definition(&self) -> TableDef {
        self.inner.definition.read().clone()
    }

    fn get(&self, key: &str) -> StoreResult<Option<Document>> {
        self.check_open()?;
        Ok(self.inner.rows.read().get(key).cloned())
    }

    fn put(&self, record: Document) -> StoreResult<()> {
        self.check_open()?;
        let definition = self.inner.definition.read().clone();
        let key = primary_key_value(&record, &definition)?;

        let mut rows = self.inner.rows.write();
        for unique in definition.unique_keys() {
            let value = record.get(unique);
            if value.is_null() {
                continue;
            }
            let conflict = rows
                .iter()
                .any(|(other_key, other)| other_key != &key && other.get(unique) == value);
            if conflict {
                return Err(StoreError::new(
                    &format!(
                        "Another record in '{}' already holds {}={}",
                        self.inner.name, unique, value
                    ),
                    ErrorKind::UniqueConstraintViolation,
                ));
            }
        }

        rows.insert(key, record);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<Option<Document>> {
        self.check_open()?;
        // shift_remove keeps insertion order for the surviving rows
        Ok(self.inner.rows.write().shift_remove(key))
    }

    fn scan(&self) -> StoreResult<Vec<Document>> {
        self.check_open()?;
        Ok(self.inner.rows.read().values().cloned().collect())
    }

    fn size(&self) -> StoreResult<usize> {
        self.check_open()?;
        Ok(self.inner.rows.read().len())
    }

    fn contains_key(&self, key: &str) -> StoreResult<bool> {
        self.check_open()?;
        Ok(self.inner.rows.read().contains_key(key))
    }
}

struct MemoryTableInner {
    name: String,
    definition: RwLock<TableDef>,
    rows: RwLock<IndexMap<String, Document>>,
    closed: Arc<AtomicBool>,
}

/// Extracts the record's primary key value as a string.
fn primary_key_value(record: &Document, definition: &TableDef) -> StoreResult<String> {
    let field = definition.primary_key();
    match record.get(field) {
        Value::String(s) => Ok(s),
        Value::Null => Err(StoreError::new(
            &format!("Record is missing its primary key field '{}'", field),
            ErrorKind::ValidationError,
        )),
        other => Err(StoreError::new(
            &format!("Primary key field '{}' must be a string, got {}", field, other),
            ErrorKind::ValidationError,
        )),
    }
}

/// Checks that no two rows share a value for any declared unique key.
fn validate_unique_keys(
    rows: &IndexMap<String, Document>,
    definition: &TableDef,
) -> StoreResult<()> {
    for unique in definition.unique_keys() {
        let mut seen: Vec<Value> = Vec::with_capacity(rows.len());
        for record in rows.values() {
            let value = record.get(unique);
            if value.is_null() {
                continue;
            }
            if seen.contains(&value) {
                return Err(StoreError::new(
                    &format!("Two records share the unique key {}={}", unique, value),
                    ErrorKind::UniqueConstraintViolation,
                ));
            }
            seen.push(value);
        }
    }
    Ok(())
}
