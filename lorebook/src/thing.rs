use uuid::Uuid;

use crate::common::{Value, NAME_FIELD, TYPE_FIELD, UUID_FIELD};
use crate::document::Document;
use crate::errors::{ErrorKind, StoreError, StoreResult};

/// A typed facade over a record [Document].
///
/// # Purpose
/// Exposes the fields every record is guaranteed to carry (the unique
/// `uuid`, the unique `name`, and the indexed `type`) while leaving all
/// other fields in the open document, so callers and migration transforms
/// can pattern-match known shapes without being aware of add-on fields.
///
/// # Characteristics
/// - Thin wrapper: cloning is O(1) via the underlying persistent map
/// - Construction from parts generates a fresh v4 uuid
/// - Construction from a raw document validates the unique keys exist
#[derive(Clone, PartialEq)]
pub struct Thing {
    document: Document,
}

impl Thing {
    /// Creates a new record with a generated uuid.
    ///
    /// # Arguments
    /// * `name` - The unique display name
    /// * `thing_type` - The type/category (for example `"Npc"` or `"Place"`)
    pub fn new(name: &str, thing_type: &str) -> Self {
        let mut document = Document::new();
        // put() only fails on empty keys; these are constants
        let _ = document.put(UUID_FIELD, Uuid::new_v4().to_string());
        let _ = document.put(NAME_FIELD, name);
        let _ = document.put(TYPE_FIELD, thing_type);
        Thing { document }
    }

    /// Wraps an existing record document.
    ///
    /// # Errors
    /// Returns `ValidationError` if the document is missing its `uuid` or
    /// `name` field, or if the `uuid` field is not a valid uuid string.
    pub fn from_document(document: Document) -> StoreResult<Self> {
        let uuid = document.get(UUID_FIELD);
        let uuid_str = uuid.as_str().ok_or_else(|| {
            StoreError::new("Record is missing its uuid field", ErrorKind::ValidationError)
        })?;
        Uuid::parse_str(uuid_str).map_err(|_| {
            StoreError::new("Record uuid field is not a valid uuid", ErrorKind::ValidationError)
        })?;

        if document.get(NAME_FIELD).as_str().is_none() {
            return Err(StoreError::new(
                "Record is missing its name field",
                ErrorKind::ValidationError,
            ));
        }

        Ok(Thing { document })
    }

    /// Returns the unique identifier of this record.
    pub fn uuid(&self) -> Uuid {
        // Validated at construction
        self.document
            .get(UUID_FIELD)
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_default()
    }

    /// Returns the unique display name of this record.
    pub fn name(&self) -> String {
        self.document
            .get(NAME_FIELD)
            .as_str()
            .unwrap_or_default()
            .to_string()
    }

    /// Returns the type/category of this record, if set.
    pub fn thing_type(&self) -> Option<String> {
        self.document.get(TYPE_FIELD).as_str().map(|s| s.to_string())
    }

    /// Returns a free-form field by name ([Value::Null] when absent).
    pub fn field(&self, name: &str) -> Value {
        self.document.get(name)
    }

    /// Sets a free-form field on this record.
    pub fn set_field<T: Into<Value>>(&mut self, name: &str, value: T) -> StoreResult<()> {
        if name == UUID_FIELD {
            return Err(StoreError::new(
                "Record uuid cannot be reassigned",
                ErrorKind::InvalidOperation,
            ));
        }
        self.document.put(name, value)
    }

    /// Returns the underlying document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Consumes this record, returning the underlying document.
    pub fn into_document(self) -> Document {
        self.document
    }
}

impl std::fmt::Debug for Thing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Thing{}", self.document)
    }
}
