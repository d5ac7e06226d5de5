//! The store's concrete schema history.
//!
//! Every version the store has ever had, declared in ascending order.
//! Transforms are field-level and partial: they rewrite only field values
//! whose legacy representation they recognize and leave everything else
//! untouched, so applying a transform twice to an already-migrated record
//! is a no-op. Absent fields are never synthesized, with the single
//! exception of `age_years` when the legacy object-shaped `age` is split.

use indexmap::IndexMap;

use crate::common::{
    Value, AGE_FIELD, AGE_YEARS_FIELD, ETHNICITY_FIELD, GENDER_FIELD, KEY_VALUES_TABLE,
    KV_KEY_FIELD, NAME_FIELD, SPECIES_FIELD, SUBTYPE_FIELD, THINGS_TABLE, TYPE_FIELD, UUID_FIELD,
};
use crate::document::Document;
use crate::errors::StoreResult;
use crate::schema::{SchemaRegistry, TableDef, VersionTransform};

/// Builds the registry holding the full schema history of the store.
///
/// | v | change |
/// |---|--------|
/// | 1 | `things` keyed by unique `uuid` |
/// | 2 | unique `name` added to `things` |
/// | 3 | gender retag (`"Trans"` becomes `"NonBinaryThey"`) |
/// | 4 | `key_values` table added; Npc object-shaped `age` split |
/// | 5 | secondary index on `type` |
/// | 6 | `"Location"` type renamed to `"Place"`; nested `subtype` flattened |
/// | 7 | enum casing normalized to lowercase kebab-case |
pub fn registry() -> StoreResult<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();

    registry.register(1, things_v1(), None)?;
    registry.register(2, things_v2(), None)?;
    registry.register(
        3,
        things_v2(),
        Some(VersionTransform::new(THINGS_TABLE, retag_trans_gender)),
    )?;
    registry.register(
        4,
        with_key_values(things_v2()),
        Some(VersionTransform::new(THINGS_TABLE, split_npc_age)),
    )?;
    registry.register(5, with_key_values(things_v5()), None)?;
    registry.register(
        6,
        with_key_values(things_v5()),
        Some(VersionTransform::new(THINGS_TABLE, rename_location_type)),
    )?;
    registry.register(
        7,
        with_key_values(things_v5()),
        Some(VersionTransform::new(THINGS_TABLE, normalize_casing)),
    )?;

    Ok(registry)
}

fn things_v1() -> IndexMap<String, TableDef> {
    let mut tables = IndexMap::new();
    tables.insert(THINGS_TABLE.to_string(), TableDef::new(&[UUID_FIELD]));
    tables
}

fn things_v2() -> IndexMap<String, TableDef> {
    let mut tables = IndexMap::new();
    tables.insert(
        THINGS_TABLE.to_string(),
        TableDef::new(&[UUID_FIELD, NAME_FIELD]),
    );
    tables
}

fn things_v5() -> IndexMap<String, TableDef> {
    let mut tables = IndexMap::new();
    tables.insert(
        THINGS_TABLE.to_string(),
        TableDef::new(&[UUID_FIELD, NAME_FIELD]).with_secondary_keys(&[TYPE_FIELD]),
    );
    tables
}

fn with_key_values(mut tables: IndexMap<String, TableDef>) -> IndexMap<String, TableDef> {
    tables.insert(KEY_VALUES_TABLE.to_string(), TableDef::new(&[KV_KEY_FIELD]));
    tables
}

/// v3: the legacy `"Trans"` gender spelling becomes `"NonBinaryThey"`.
/// Any other value, or an absent field, is left untouched.
fn retag_trans_gender(mut record: Document) -> StoreResult<Document> {
    if record.get(GENDER_FIELD).as_str() == Some("Trans") {
        record.put(GENDER_FIELD, "NonBinaryThey")?;
    }
    Ok(record)
}

/// v4: on Npc records only, the legacy object-shaped
/// `age = {type, value}` splits into `age` (= `type`) and a new
/// `age_years` field (= `value`). The field is left untouched when the
/// legacy shape is absent; `age_years` is only introduced when the nested
/// `value` is present.
fn split_npc_age(mut record: Document) -> StoreResult<Document> {
    if record.get(TYPE_FIELD).as_str() != Some("Npc") {
        return Ok(record);
    }

    let legacy = match record.get(AGE_FIELD) {
        Value::Document(inner) => inner,
        _ => return Ok(record),
    };

    let category = match legacy.get("type").as_str() {
        Some(category) => category.to_string(),
        None => return Ok(record),
    };

    let years = legacy.get("value");
    record.put(AGE_FIELD, category)?;
    if !years.is_null() {
        record.put(AGE_YEARS_FIELD, years)?;
    }
    Ok(record)
}

/// v6: the `"Location"` type spelling becomes `"Place"`, and a nested
/// `subtype.subtype` shape is flattened to the nested value. Both rewrites
/// are structural: unrecognized values and shapes pass through untouched.
fn rename_location_type(mut record: Document) -> StoreResult<Document> {
    if record.get(TYPE_FIELD).as_str() == Some("Location") {
        record.put(TYPE_FIELD, "Place")?;
    }

    if let Value::Document(inner) = record.get(SUBTYPE_FIELD) {
        let nested = inner.get(SUBTYPE_FIELD);
        if !nested.is_null() {
            record.put(SUBTYPE_FIELD, nested)?;
        }
    }
    Ok(record)
}

/// v7: enum-cased field values are normalized to lowercase kebab-case.
///
/// Known spellings map explicitly (`"YoungAdult"` to `"young-adult"`,
/// `"NonBinaryThey"` to `"non-binary"`, `"HalfElf"` to `"half-elf"`,
/// `"HalfOrc"` to `"half-orc"`, `"MiddleAged"` to `"middle-aged"`); any
/// other present string value falls through to plain lowercasing.
/// Absent fields stay absent; non-string values are left untouched.
fn normalize_casing(mut record: Document) -> StoreResult<Document> {
    rewrite_string_field(&mut record, AGE_FIELD, |age| match age {
        "YoungAdult" => "young-adult".to_string(),
        "MiddleAged" => "middle-aged".to_string(),
        other => other.to_lowercase(),
    })?;

    rewrite_string_field(&mut record, ETHNICITY_FIELD, |e| e.to_lowercase())?;

    rewrite_string_field(&mut record, GENDER_FIELD, |gender| match gender {
        "NonBinaryThey" => "non-binary".to_string(),
        other => other.to_lowercase(),
    })?;

    rewrite_string_field(&mut record, SPECIES_FIELD, |species| match species {
        "HalfElf" => "half-elf".to_string(),
        "HalfOrc" => "half-orc".to_string(),
        other => other.to_lowercase(),
    })?;

    rewrite_string_field(&mut record, SUBTYPE_FIELD, |s| s.to_lowercase())?;

    Ok(record)
}

fn rewrite_string_field<F>(record: &mut Document, field: &str, rewrite: F) -> StoreResult<()>
where
    F: FnOnce(&str) -> String,
{
    if let Some(current) = record.get(field).as_str() {
        let rewritten = rewrite(current);
        if rewritten != current {
            record.put(field, rewritten)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    // ==================== Registry Shape Tests ====================

    #[test]
    fn test_registry_declares_seven_versions() {
        let registry = registry().unwrap();
        assert_eq!(registry.latest_version(), 7);
        let versions: Vec<u32> = registry.versions().iter().map(|s| s.version()).collect();
        assert_eq!(versions, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_transforms_sit_at_expected_versions() {
        let registry = registry().unwrap();
        for spec in registry.versions() {
            let expected = matches!(spec.version(), 3 | 4 | 6 | 7);
            assert_eq!(
                spec.transform().is_some(),
                expected,
                "version {}",
                spec.version()
            );
        }
    }

    #[test]
    fn test_key_values_table_appears_at_v4() {
        let registry = registry().unwrap();
        for spec in registry.versions() {
            let has_kv = spec.tables().contains_key(KEY_VALUES_TABLE);
            assert_eq!(has_kv, spec.version() >= 4, "version {}", spec.version());
        }
    }

    #[test]
    fn test_type_index_appears_at_v5() {
        let registry = registry().unwrap();
        for spec in registry.versions() {
            let things = spec.tables().get(THINGS_TABLE).unwrap();
            let indexed = things.secondary_keys().contains(&TYPE_FIELD.to_string());
            assert_eq!(indexed, spec.version() >= 5, "version {}", spec.version());
        }
    }

    // ==================== v3 Gender Retag ====================

    #[test]
    fn test_retag_trans_gender() {
        let record = doc! { gender: "Trans" };
        let out = retag_trans_gender(record).unwrap();
        assert_eq!(out.get(GENDER_FIELD).as_str(), Some("NonBinaryThey"));
    }

    #[test]
    fn test_retag_leaves_other_genders_unchanged() {
        let record = doc! { gender: "Feminine" };
        let out = retag_trans_gender(record).unwrap();
        assert_eq!(out.get(GENDER_FIELD).as_str(), Some("Feminine"));
    }

    #[test]
    fn test_retag_leaves_absent_gender_absent() {
        let record = doc! { name: "Penelope" };
        let out = retag_trans_gender(record).unwrap();
        assert!(!out.contains_key(GENDER_FIELD));
    }

    #[test]
    fn test_retag_is_idempotent() {
        let record = doc! { gender: "Trans" };
        let once = retag_trans_gender(record).unwrap();
        let twice = retag_trans_gender(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    // ==================== v4 Age Split ====================

    #[test]
    fn test_split_npc_age_object() {
        let record = doc! {
            type: "Npc",
            age: { type: "adult", value: 35 },
        };
        let out = split_npc_age(record).unwrap();
        assert_eq!(out.get(AGE_FIELD).as_str(), Some("adult"));
        assert_eq!(out.get(AGE_YEARS_FIELD).as_i64(), Some(35));
    }

    #[test]
    fn test_split_skips_non_npc_records() {
        let record = doc! {
            type: "Place",
            age: { type: "adult", value: 35 },
        };
        let out = split_npc_age(record).unwrap();
        assert!(out.get(AGE_FIELD).as_document().is_some());
        assert!(!out.contains_key(AGE_YEARS_FIELD));
    }

    #[test]
    fn test_split_leaves_plain_age_unchanged() {
        let record = doc! { type: "Npc", age: "adult" };
        let out = split_npc_age(record).unwrap();
        assert_eq!(out.get(AGE_FIELD).as_str(), Some("adult"));
        assert!(!out.contains_key(AGE_YEARS_FIELD));
    }

    #[test]
    fn test_split_without_value_does_not_synthesize_age_years() {
        let record = doc! { type: "Npc", age: { type: "adult" } };
        let out = split_npc_age(record).unwrap();
        assert_eq!(out.get(AGE_FIELD).as_str(), Some("adult"));
        assert!(!out.contains_key(AGE_YEARS_FIELD));
    }

    #[test]
    fn test_split_is_idempotent() {
        let record = doc! {
            type: "Npc",
            age: { type: "adult", value: 35 },
        };
        let once = split_npc_age(record).unwrap();
        let twice = split_npc_age(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    // ==================== v6 Location Rename ====================

    #[test]
    fn test_rename_location_and_flatten_subtype() {
        let record = doc! {
            type: "Location",
            subtype: { subtype: "Tavern" },
        };
        let out = rename_location_type(record).unwrap();
        assert_eq!(out.get(TYPE_FIELD).as_str(), Some("Place"));
        assert_eq!(out.get(SUBTYPE_FIELD).as_str(), Some("Tavern"));
    }

    #[test]
    fn test_rename_leaves_other_types_unchanged() {
        let record = doc! { type: "Npc", subtype: "bandit" };
        let out = rename_location_type(record).unwrap();
        assert_eq!(out.get(TYPE_FIELD).as_str(), Some("Npc"));
        assert_eq!(out.get(SUBTYPE_FIELD).as_str(), Some("bandit"));
    }

    #[test]
    fn test_flatten_ignores_nested_doc_without_inner_subtype() {
        let record = doc! { type: "Place", subtype: { kind: "Tavern" } };
        let out = rename_location_type(record).unwrap();
        assert!(out.get(SUBTYPE_FIELD).as_document().is_some());
    }

    #[test]
    fn test_rename_is_idempotent() {
        let record = doc! {
            type: "Location",
            subtype: { subtype: "Tavern" },
        };
        let once = rename_location_type(record).unwrap();
        let twice = rename_location_type(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    // ==================== v7 Casing Normalization ====================

    #[test]
    fn test_normalize_known_age_spellings() {
        let out = normalize_casing(doc! { age: "YoungAdult" }).unwrap();
        assert_eq!(out.get(AGE_FIELD).as_str(), Some("young-adult"));

        let out = normalize_casing(doc! { age: "MiddleAged" }).unwrap();
        assert_eq!(out.get(AGE_FIELD).as_str(), Some("middle-aged"));
    }

    #[test]
    fn test_normalize_lowercases_unknown_age() {
        let out = normalize_casing(doc! { age: "Elderly" }).unwrap();
        assert_eq!(out.get(AGE_FIELD).as_str(), Some("elderly"));
    }

    #[test]
    fn test_normalize_gender_spellings() {
        let out = normalize_casing(doc! { gender: "NonBinaryThey" }).unwrap();
        assert_eq!(out.get(GENDER_FIELD).as_str(), Some("non-binary"));

        let out = normalize_casing(doc! { gender: "Feminine" }).unwrap();
        assert_eq!(out.get(GENDER_FIELD).as_str(), Some("feminine"));
    }

    #[test]
    fn test_normalize_species_spellings() {
        let out = normalize_casing(doc! { species: "HalfElf" }).unwrap();
        assert_eq!(out.get(SPECIES_FIELD).as_str(), Some("half-elf"));

        let out = normalize_casing(doc! { species: "HalfOrc" }).unwrap();
        assert_eq!(out.get(SPECIES_FIELD).as_str(), Some("half-orc"));

        let out = normalize_casing(doc! { species: "Dwarf" }).unwrap();
        assert_eq!(out.get(SPECIES_FIELD).as_str(), Some("dwarf"));
    }

    #[test]
    fn test_normalize_ethnicity_and_subtype_lowercase() {
        let out = normalize_casing(doc! { ethnicity: "Mediterranean", subtype: "Tavern" }).unwrap();
        assert_eq!(out.get(ETHNICITY_FIELD).as_str(), Some("mediterranean"));
        assert_eq!(out.get(SUBTYPE_FIELD).as_str(), Some("tavern"));
    }

    #[test]
    fn test_normalize_absent_fields_stay_absent() {
        let out = normalize_casing(doc! { name: "Penelope" }).unwrap();
        for field in [AGE_FIELD, ETHNICITY_FIELD, GENDER_FIELD, SPECIES_FIELD, SUBTYPE_FIELD] {
            assert!(!out.contains_key(field), "field {}", field);
        }
    }

    #[test]
    fn test_normalize_leaves_non_string_values_untouched() {
        let record = doc! { age: 35, subtype: { subtype: "Tavern" } };
        let out = normalize_casing(record.clone()).unwrap();
        assert_eq!(out, record);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let record = doc! {
            age: "YoungAdult",
            ethnicity: "Mediterranean",
            gender: "NonBinaryThey",
            species: "HalfElf",
            subtype: "Bandit",
        };
        let once = normalize_casing(record).unwrap();
        let twice = normalize_casing(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unrelated_fields_survive_every_transform() {
        let record = doc! {
            uuid: "0e79bd74-4a41-4a65-9273-83d3bdcbbc63",
            name: "Penelope",
            type: "Npc",
            gender: "Trans",
            favorite_color: "Teal",
            age: { type: "YoungAdult", value: 24 },
        };

        let out = retag_trans_gender(record).unwrap();
        let out = split_npc_age(out).unwrap();
        let out = rename_location_type(out).unwrap();
        let out = normalize_casing(out).unwrap();

        // Untouched free-form field keeps its exact casing
        assert_eq!(out.get("favorite_color").as_str(), Some("Teal"));
        assert_eq!(out.get(NAME_FIELD).as_str(), Some("Penelope"));
        // Chained rewrites landed
        assert_eq!(out.get(GENDER_FIELD).as_str(), Some("non-binary"));
        assert_eq!(out.get(AGE_FIELD).as_str(), Some("young-adult"));
        assert_eq!(out.get(AGE_YEARS_FIELD).as_i64(), Some(24));
    }
}
