use crate::document::Document;
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};

/// Dynamic value stored in a [Document].
///
/// # Purpose
/// Records are schema-less field mappings; `Value` is the closed set of
/// shapes a field can take on disk. Legacy field representations (for
/// example the pre-split `age` object) are detected structurally by
/// pattern-matching these variants, never via a per-record version stamp.
///
/// # Characteristics
/// - Clone-able: nested documents clone in O(1) via the persistent map
/// - Missing document keys read as [Value::Null]
/// - Optional serde support behind the `serde` feature (default on)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    U32(u32),
    F64(f64),
    String(String),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    /// Returns `true` if this value is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the contained string slice, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the contained signed integer, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(i) => Some(*i),
            Value::U32(u) => Some(i64::from(*u)),
            _ => None,
        }
    }

    /// Returns the contained unsigned integer, if this is a u32 value.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(u) => Some(*u),
            Value::I64(i) => u32::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Returns the contained float, if this is a float value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the contained array, if this is an array value.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the contained document, if this is a nested document.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I64(i) => write!(f, "{}", i),
            Value::U32(u) => write!(f, "{}", u),
            Value::F64(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(values) => {
                write!(f, "[{}]", values.iter().map(|v| v.to_string()).join(", "))
            }
            Value::Document(doc) => write!(f, "{}", doc),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::I64(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::I64(i)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::U32(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_null_default() {
        assert_eq!(Value::default(), Value::Null);
        assert!(Value::Null.is_null());
        assert!(!Value::from("x").is_null());
    }

    #[test]
    fn test_string_accessor() {
        let v = Value::from("Tavern");
        assert_eq!(v.as_str(), Some("Tavern"));
        assert_eq!(v.as_bool(), None);
        assert_eq!(Value::Null.as_str(), None);
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(Value::from(42i64).as_i64(), Some(42));
        assert_eq!(Value::from(7u32).as_u32(), Some(7));
        assert_eq!(Value::from(7u32).as_i64(), Some(7));
        assert_eq!(Value::from(42i64).as_u32(), Some(42));
        assert_eq!(Value::from(-1i64).as_u32(), None);
        assert_eq!(Value::from(1.5f64).as_f64(), Some(1.5));
    }

    #[test]
    fn test_document_accessor() {
        let v = Value::from(doc! { subtype: "Tavern" });
        let doc = v.as_document().unwrap();
        assert_eq!(doc.get("subtype").as_str(), Some("Tavern"));
        assert_eq!(Value::from("x").as_document(), None);
    }

    #[test]
    fn test_array_display() {
        let v = Value::Array(vec![Value::from(1i64), Value::from("a")]);
        assert_eq!(v.to_string(), "[1, a]");
    }

    #[test]
    fn test_option_conversion() {
        let some: Value = Some("young-adult").into();
        assert_eq!(some.as_str(), Some("young-adult"));
        let none: Value = Option::<String>::None.into();
        assert!(none.is_null());
    }
}
