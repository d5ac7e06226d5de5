//! Storage engine abstractions.
//!
//! The migration driver and the accessor layer talk to storage through the
//! [StorageBackend] and [TableProvider] traits. A backend must detect the
//! store's last-persisted schema version, apply a [VersionSpec] (table
//! definitions plus optional transform plus version bump) as one atomic
//! unit, and enforce the declared unique keys on every write.

pub use memory::{MemoryBackend, MemoryTable};

pub mod memory;

use std::sync::Arc;

use crate::common::Value;
use crate::document::Document;
use crate::errors::StoreResult;
use crate::schema::{TableDef, VersionSpec};

/// Contract for storage engine implementations.
///
/// # Atomicity
/// `apply_version` is the unit of migration: the version's table/index
/// definitions, its transform over every existing record of the target
/// table, and the persisted version bump must commit together or not at
/// all. A failed step leaves the store at its last committed version.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`.
pub trait StorageBackend: Send + Sync {
    /// Returns the last-persisted schema version, or `None` for a freshly
    /// created store that has never committed a version.
    fn persisted_version(&self) -> StoreResult<Option<u32>>;

    /// Applies one schema version atomically: table definitions, then the
    /// transform (if any) over every current record of its table, then the
    /// version bump.
    fn apply_version(&self, spec: &VersionSpec) -> StoreResult<()>;

    /// Checks whether a table exists.
    fn has_table(&self, name: &str) -> StoreResult<bool>;

    /// Opens a handle to an existing table.
    fn open_table(&self, name: &str) -> StoreResult<Table>;

    /// Checks if the backend has been closed.
    fn is_closed(&self) -> StoreResult<bool>;

    /// Closes the backend; further operations fail with
    /// `StoreAlreadyClosed`.
    fn close(&self) -> StoreResult<()>;
}

/// Cloneable handle over a [StorageBackend] implementation.
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn StorageBackend>,
}

impl Store {
    /// Wraps a backend implementation.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Store {
            inner: Arc::new(backend),
        }
    }

    pub fn persisted_version(&self) -> StoreResult<Option<u32>> {
        self.inner.persisted_version()
    }

    pub fn apply_version(&self, spec: &VersionSpec) -> StoreResult<()> {
        self.inner.apply_version(spec)
    }

    pub fn has_table(&self, name: &str) -> StoreResult<bool> {
        self.inner.has_table(name)
    }

    pub fn open_table(&self, name: &str) -> StoreResult<Table> {
        self.inner.open_table(name)
    }

    pub fn is_closed(&self) -> StoreResult<bool> {
        self.inner.is_closed()
    }

    pub fn close(&self) -> StoreResult<()> {
        self.inner.close()
    }
}

/// Contract for a single table of records.
///
/// Records are documents keyed by the table's primary key (the first
/// declared unique key). Writes enforce every declared unique key.
pub trait TableProvider: Send + Sync {
    /// Returns the table name.
    fn name(&self) -> String;

    /// Returns the definition currently in force for this table.
    fn definition(&self) -> TableDef;

    /// Retrieves the record stored under the primary key value.
    fn get(&self, key: &str) -> StoreResult<Option<Document>>;

    /// Inserts or replaces the record stored under its primary key value.
    ///
    /// # Errors
    /// `UniqueConstraintViolation` if another record already holds one of
    /// this record's declared-unique field values; `ValidationError` if
    /// the record is missing its primary key field.
    fn put(&self, record: Document) -> StoreResult<()>;

    /// Removes the record under the primary key value, returning it.
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<Option<Document>>;

    /// Returns every record in insertion order.
    fn scan(&self) -> StoreResult<Vec<Document>>;

    /// Returns the number of records.
    fn size(&self) -> StoreResult<usize>;

    /// Checks whether a record exists under the primary key value.
    fn contains_key(&self, key: &str) -> StoreResult<bool>;
}

/// Cloneable handle over a [TableProvider] implementation.
#[derive(Clone)]
pub struct Table {
    inner: Arc<dyn TableProvider>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").finish_non_exhaustive()
    }
}

impl Table {
    /// Wraps a table implementation.
    pub fn new(provider: impl TableProvider + 'static) -> Self {
        Table {
            inner: Arc::new(provider),
        }
    }

    pub fn name(&self) -> String {
        self.inner.name()
    }

    pub fn definition(&self) -> TableDef {
        self.inner.definition()
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<Document>> {
        self.inner.get(key)
    }

    pub fn put(&self, record: Document) -> StoreResult<()> {
        self.inner.put(record)
    }

    pub fn remove(&self, key: &str) -> StoreResult<Option<Document>> {
        self.inner.remove(key)
    }

    pub fn scan(&self) -> StoreResult<Vec<Document>> {
        self.inner.scan()
    }

    pub fn size(&self) -> StoreResult<usize> {
        self.inner.size()
    }

    pub fn contains_key(&self, key: &str) -> StoreResult<bool> {
        self.inner.contains_key(key)
    }
}

/// Store-global metadata persisted alongside the data.
///
/// Captures when the store was created and the schema version it was last
/// persisted with. Converts to/from a [Document] for backends that keep
/// their metadata as a record. Extraction is lenient: missing or
/// wrongly-typed fields fall back to defaults so older metadata documents
/// stay readable.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreMetadata {
    pub create_time: u64,
    pub schema_version: u32,
}

impl StoreMetadata {
    /// Extracts metadata from a document, defaulting missing fields.
    pub fn from_document(document: &Document) -> StoreMetadata {
        StoreMetadata {
            create_time: document
                .get("create_time")
                .as_i64()
                .and_then(|t| u64::try_from(t).ok())
                .unwrap_or(0),
            schema_version: document.get("schema_version").as_u32().unwrap_or(0),
        }
    }

    /// Serializes this metadata to a document.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        // put() only fails on empty keys
        let _ = document.put("create_time", self.create_time as i64);
        let _ = document.put("schema_version", self.schema_version);
        document
    }
}

/// Returns the current wall-clock time in milliseconds since the epoch,
/// or 0 when the clock is unavailable.
pub(crate) fn current_time_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// Convenience used by the key-value accessor layer.
pub(crate) fn kv_document(key: &str, value: Value) -> StoreResult<Document> {
    let mut document = Document::new();
    document.put(crate::common::KV_KEY_FIELD, key)?;
    document.put(crate::common::KV_VALUE_FIELD, value)?;
    Ok(document)
}
