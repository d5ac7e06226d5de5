//! Schema declaration and version ordering.
//!
//! A [SchemaRegistry] is an ordered list of [VersionSpec]s: every schema
//! version the store has ever had, each declaring its table definitions
//! and, optionally, a record transform run once when upgrading past that
//! version. The registry is pure declaration plus filtering; applying a
//! spec against live storage is the migration driver's job.

pub use history::registry as history_registry;

pub mod history;

use indexmap::IndexMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::document::Document;
use crate::errors::{ErrorKind, StoreError, StoreResult};

/// A pure per-record transform: receives one record and returns the
/// rewritten record. Total for any well-formed or legacy record shape.
pub type TransformFn = Arc<dyn Fn(Document) -> StoreResult<Document> + Send + Sync>;

/// Declares the unique and secondary index keys of one table.
///
/// The first unique key is the table's primary key; records are stored
/// under its value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDef {
    unique_keys: Vec<String>,
    secondary_keys: Vec<String>,
}

impl TableDef {
    /// Creates a table definition with the given unique key(s).
    ///
    /// # Panics
    /// Never panics, but an empty `unique_keys` list is rejected at
    /// registration time — every table needs a primary key.
    pub fn new(unique_keys: &[&str]) -> Self {
        TableDef {
            unique_keys: unique_keys.iter().map(|s| s.to_string()).collect(),
            secondary_keys: Vec::new(),
        }
    }

    /// Adds secondary index key(s) to this definition.
    pub fn with_secondary_keys(mut self, secondary_keys: &[&str]) -> Self {
        self.secondary_keys = secondary_keys.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Returns the declared unique keys; the first is the primary key.
    pub fn unique_keys(&self) -> &[String] {
        &self.unique_keys
    }

    /// Returns the primary key field of this table.
    pub fn primary_key(&self) -> &str {
        // Non-empty enforced by SchemaRegistry::register
        self.unique_keys.first().map(|s| s.as_str()).unwrap_or("")
    }

    /// Returns the declared secondary index keys.
    pub fn secondary_keys(&self) -> &[String] {
        &self.secondary_keys
    }
}

/// A record transform bound to the table whose records it rewrites.
#[derive(Clone)]
pub struct VersionTransform {
    table: String,
    apply: TransformFn,
}

impl VersionTransform {
    /// Creates a transform over every record of `table`.
    pub fn new<F>(table: &str, apply: F) -> Self
    where
        F: Fn(Document) -> StoreResult<Document> + Send + Sync + 'static,
    {
        VersionTransform {
            table: table.to_string(),
            apply: Arc::new(apply),
        }
    }

    /// Returns the table this transform targets.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Applies the transform to a single record.
    pub fn apply(&self, record: Document) -> StoreResult<Document> {
        (self.apply)(record)
    }
}

impl Debug for VersionTransform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionTransform")
            .field("table", &self.table)
            .field("apply", &"<fn>")
            .finish()
    }
}

/// One schema version: a version number, the table definitions in force at
/// that version, and an optional per-record transform run once when a
/// store is upgraded past this version.
#[derive(Clone, Debug)]
pub struct VersionSpec {
    version: u32,
    tables: IndexMap<String, TableDef>,
    transform: Option<VersionTransform>,
}

impl VersionSpec {
    /// Returns the version number of this spec.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the table definitions declared at this version.
    pub fn tables(&self) -> &IndexMap<String, TableDef> {
        &self.tables
    }

    /// Returns the transform declared at this version, if any.
    pub fn transform(&self) -> Option<&VersionTransform> {
        self.transform.as_ref()
    }

    /// Returns a copy of this spec with the transform stripped.
    ///
    /// Used when creating a fresh store: there are no prior records to
    /// transform, so only the table definitions apply.
    pub fn without_transform(&self) -> VersionSpec {
        VersionSpec {
            version: self.version,
            tables: self.tables.clone(),
            transform: None,
        }
    }
}

/// Ordered list of every schema version the store has ever had.
///
/// # Contract
/// - `register` requires each version to be strictly greater than every
///   previously registered version; the declaration list itself is the
///   source of truth for ordering.
/// - `upgrade_path` is pure filtering: the specs with
///   `persisted < version <= target`, ascending.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    versions: Vec<VersionSpec>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        SchemaRegistry { versions: Vec::new() }
    }

    /// Declares a schema version.
    ///
    /// # Arguments
    /// * `version` - Strictly greater than every version registered so far
    /// * `tables` - Table name to definition mapping in force at this version
    /// * `transform` - Optional per-record transform run once on upgrade
    ///
    /// # Errors
    /// `ValidationError` on a non-increasing version, an empty table set,
    /// a table without a primary key, or a transform targeting a table not
    /// declared at this version. These are build-time declaration errors,
    /// never runtime conditions checked against live data.
    pub fn register(
        &mut self,
        version: u32,
        tables: IndexMap<String, TableDef>,
        transform: Option<VersionTransform>,
    ) -> StoreResult<()> {
        if let Some(last) = self.versions.last() {
            if version <= last.version {
                return Err(StoreError::new(
                    &format!(
                        "Schema version {} must be greater than previously registered version {}",
                        version, last.version
                    ),
                    ErrorKind::ValidationError,
                ));
            }
        }

        if tables.is_empty() {
            return Err(StoreError::new(
                &format!("Schema version {} declares no tables", version),
                ErrorKind::ValidationError,
            ));
        }

        for (name, def) in &tables {
            if def.unique_keys().is_empty() {
                return Err(StoreError::new(
                    &format!("Table '{}' at version {} has no primary key", name, version),
                    ErrorKind::ValidationError,
                ));
            }
        }

        if let Some(t) = &transform {
            if !tables.contains_key(t.table()) {
                return Err(StoreError::new(
                    &format!(
                        "Transform at version {} targets undeclared table '{}'",
                        version,
                        t.table()
                    ),
                    ErrorKind::ValidationError,
                ));
            }
        }

        self.versions.push(VersionSpec {
            version,
            tables,
            transform,
        });
        Ok(())
    }

    /// Returns the highest registered version, or 0 when empty.
    pub fn latest_version(&self) -> u32 {
        self.versions.last().map(|s| s.version).unwrap_or(0)
    }

    /// Returns every registered spec in ascending order.
    pub fn versions(&self) -> &[VersionSpec] {
        &self.versions
    }

    /// Returns the specs to apply when upgrading a store persisted at
    /// `persisted` to `target`: those with `persisted < version <= target`,
    /// in ascending order.
    pub fn upgrade_path(&self, persisted: u32, target: u32) -> Vec<VersionSpec> {
        self.versions
            .iter()
            .filter(|spec| spec.version > persisted && spec.version <= target)
            .cloned()
            .collect()
    }
}
