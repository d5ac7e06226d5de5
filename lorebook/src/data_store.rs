use std::sync::Arc;
use uuid::Uuid;

use crate::common::{Value, KEY_VALUES_TABLE, KV_VALUE_FIELD, NAME_FIELD, THINGS_TABLE};
use crate::errors::StoreResult;
use crate::store::{kv_document, Store, Table};
use crate::thing::Thing;

/// The application-facing surface of an opened store.
///
/// # Purpose
/// Exposes typed access to the two core tables: the `things` table of
/// records and the `key_values` table of loose settings. The accessors
/// deliberately flatten all storage faults: reads come back empty
/// (`Vec::new()` / `None`) and writes report plain success booleans, with
/// the underlying error logged. Callers that need the failure detail use
/// the builder's `open()` result instead; once a store is open, a fault
/// mid-session is not actionable for the caller.
///
/// # Characteristics
/// - Cloning is cheap; all clones share the same backend
/// - `save_thing` enforces uuid and name uniqueness; a rejected save
///   leaves any existing record untouched
/// - `delete_thing` and `delete_value` are idempotent: deleting an absent
///   entry succeeds
#[derive(Clone)]
pub struct DataStore {
    inner: Arc<DataStoreInner>,
}

struct DataStoreInner {
    store: Store,
    things: Table,
    key_values: Table,
}

impl DataStore {
    /// Wraps an already-migrated store. Both core tables must exist.
    pub(crate) fn new(store: Store) -> StoreResult<Self> {
        let things = store.open_table(THINGS_TABLE)?;
        let key_values = store.open_table(KEY_VALUES_TABLE)?;
        Ok(DataStore {
            inner: Arc::new(DataStoreInner {
                store,
                things,
                key_values,
            }),
        })
    }

    /// Returns every record in storage order, or an empty vector if the
    /// store fails.
    pub fn get_all_things(&self) -> Vec<Thing> {
        match self.try_get_all_things() {
            Ok(things) => things,
            Err(e) => {
                log::warn!("Failed to list records: {}", e);
                Vec::new()
            }
        }
    }

    /// Looks up a record by uuid. `None` covers both "not found" and a
    /// failing store.
    pub fn get_thing(&self, uuid: &Uuid) -> Option<Thing> {
        match self.try_get_thing(uuid) {
            Ok(thing) => thing,
            Err(e) => {
                log::warn!("Failed to load record {}: {}", uuid, e);
                None
            }
        }
    }

    /// Saves a record, returning whether it was stored. A record whose
    /// name collides with a different record is rejected and the existing
    /// record is left untouched.
    pub fn save_thing(&self, thing: &Thing) -> bool {
        match self.try_save_thing(thing) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save record '{}': {}", thing.name(), e);
                false
            }
        }
    }

    /// Deletes a record by uuid. Deleting an absent uuid succeeds; only a
    /// failing store reports `false`.
    pub fn delete_thing(&self, uuid: &Uuid) -> bool {
        match self.try_delete_thing(uuid) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to delete record {}: {}", uuid, e);
                false
            }
        }
    }

    /// Looks up a setting by key. `None` covers both "not set" and a
    /// failing store.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        match self.try_get_value(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to load value '{}': {}", key, e);
                None
            }
        }
    }

    /// Stores a setting under a key, replacing any previous value.
    pub fn set_value(&self, key: &str, value: Value) -> bool {
        match self.try_set_value(key, value) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to store value '{}': {}", key, e);
                false
            }
        }
    }

    /// Deletes a setting by key. Deleting an absent key succeeds.
    pub fn delete_value(&self, key: &str) -> bool {
        match self.try_delete_value(key) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to delete value '{}': {}", key, e);
                false
            }
        }
    }

    /// Closes the underlying store. Accessors fail (and flatten) after.
    pub fn close(&self) -> StoreResult<()> {
        self.inner.store.close()
    }

    fn try_get_all_things(&self) -> StoreResult<Vec<Thing>> {
        let records = self.inner.things.scan()?;
        let mut things = Vec::with_capacity(records.len());
        for record in records {
            things.push(Thing::from_document(record)?);
        }
        Ok(things)
    }

    fn try_get_thing(&self, uuid: &Uuid) -> StoreResult<Option<Thing>> {
        let record = self.inner.things.get(&uuid.to_string())?;
        record.map(Thing::from_document).transpose()
    }

    fn try_save_thing(&self, thing: &Thing) -> StoreResult<()> {
        self.inner.things.put(thing.document().clone())
    }

    fn try_delete_thing(&self, uuid: &Uuid) -> StoreResult<()> {
        self.inner.things.remove(&uuid.to_string())?;
        Ok(())
    }

    fn try_get_value(&self, key: &str) -> StoreResult<Option<Value>> {
        let entry = self.inner.key_values.get(key)?;
        Ok(entry.map(|doc| doc.get(KV_VALUE_FIELD)))
    }

    fn try_set_value(&self, key: &str, value: Value) -> StoreResult<()> {
        self.inner.key_values.put(kv_document(key, value)?)
    }

    fn try_delete_value(&self, key: &str) -> StoreResult<()> {
        self.inner.key_values.remove(key)?;
        Ok(())
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("things", &self.inner.things.name())
            .field("key_values", &self.inner.key_values.name())
            .finish()
    }
}

// Name lookups used by callers that identify records by display name.
impl DataStore {
    /// Looks up a record by its unique name. `None` covers both "not
    /// found" and a failing store.
    pub fn get_thing_by_name(&self, name: &str) -> Option<Thing> {
        match self.try_get_thing_by_name(name) {
            Ok(thing) => thing,
            Err(e) => {
                log::warn!("Failed to load record '{}': {}", name, e);
                None
            }
        }
    }

    fn try_get_thing_by_name(&self, name: &str) -> StoreResult<Option<Thing>> {
        for record in self.inner.things.scan()? {
            if record.get(NAME_FIELD).as_str() == Some(name) {
                return Ok(Some(Thing::from_document(record)?));
            }
        }
        Ok(None)
    }
}
