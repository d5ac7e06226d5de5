pub use value::Value;

pub mod value;

use parking_lot::RwLock;
use std::sync::Arc;

/// Shared mutable cell used for cheaply cloneable interior state.
pub type Atomic<T> = Arc<RwLock<T>>;

/// Wraps a value in an [Atomic] cell.
pub fn atomic<T>(t: T) -> Atomic<T> {
    Arc::new(RwLock::new(t))
}

/// Name of the table holding records ("things").
pub const THINGS_TABLE: &str = "things";

/// Name of the table holding key-value settings.
pub const KEY_VALUES_TABLE: &str = "key_values";

/// Unique identifier field of a record.
pub const UUID_FIELD: &str = "uuid";

/// Unique display-name field of a record.
pub const NAME_FIELD: &str = "name";

/// Indexed type/category field of a record.
pub const TYPE_FIELD: &str = "type";

/// Free-form record fields recognized by the migration history.
pub const AGE_FIELD: &str = "age";
pub const AGE_YEARS_FIELD: &str = "age_years";
pub const ETHNICITY_FIELD: &str = "ethnicity";
pub const GENDER_FIELD: &str = "gender";
pub const SPECIES_FIELD: &str = "species";
pub const SUBTYPE_FIELD: &str = "subtype";

/// Key and value fields of a key-value entry.
pub const KV_KEY_FIELD: &str = "key";
pub const KV_VALUE_FIELD: &str = "value";
