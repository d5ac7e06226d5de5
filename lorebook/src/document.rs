use im::OrdMap;
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};

use crate::common::Value;
use crate::errors::{ErrorKind, StoreError, StoreResult};

/// Represents a schema-less record as a persistent key-value mapping.
///
/// A document is composed of key-value pairs. The key is always a [String]
/// and the value is a [Value]. Beyond the keys a table declares as unique
/// or indexed, fields are free-form: migration transforms only rewrite
/// fields whose legacy representation they recognize and carry everything
/// else through untouched.
///
/// ## Lock-Free Design
///
/// This struct uses `im::OrdMap` (a persistent ordered map):
/// - O(1) cloning via internal Arc sharing
/// - Mutations create new maps via structural sharing
/// - Each mutated document is completely independent
#[derive(Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document { data: OrdMap::new() }
    }

    /// Checks if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of fields in this document.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates the specified [Value] with the specified key.
    ///
    /// If the key already exists, its value is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty.
    pub fn put<T: Into<Value>>(&mut self, key: impl Into<String>, value: T) -> StoreResult<()> {
        let key = key.into();
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(StoreError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        self.data = self.data.update(key, value.into());
        Ok(())
    }

    /// Returns the [Value] associated with the key, or [Value::Null] if
    /// this document contains no mapping for the key.
    ///
    /// Nested shapes are reached by matching on [Value::Document]:
    ///
    /// ```ignore
    /// if let Value::Document(inner) = doc.get("subtype") {
    ///     let nested = inner.get("subtype");
    /// }
    /// ```
    pub fn get(&self, key: &str) -> Value {
        self.data.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Checks whether the document contains a mapping for the key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Removes the mapping for the key, returning the previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let previous = self.data.get(key).cloned();
        if previous.is_some() {
            self.data = self.data.without(key);
        }
        previous
    }

    /// Returns an iterator over the fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Returns the field names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.data
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .join(", ")
        )
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Strips the quotes `stringify!` leaves around string-literal keys in the
/// [doc!](crate::doc) macro.
pub fn normalize(key: &str) -> String {
    key.trim_matches('"').to_string()
}

/// Creates a [Document] from key-value literals.
///
/// Keys may be identifiers or string literals; values may be expressions,
/// nested `{ ... }` documents, or `[ ... ]` arrays.
///
/// ```ignore
/// let thing = doc! {
///     name: "Penelope",
///     type: "Npc",
///     age: { type: "adult", value: 35 },
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::document::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::document::Document::new();
            $(
                doc.put($crate::document::normalize(stringify!($key)), $crate::doc_value!($value))
                    .expect("Failed to put value in document");
            )*
            doc
        }
    };
}

/// Helper macro converting values for the [doc!](crate::doc) macro.
/// Handles nested documents, arrays, and expressions.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
