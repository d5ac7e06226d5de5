use crate::errors::{ErrorKind, StoreError, StoreResult};
use crate::schema::SchemaRegistry;
use crate::store::Store;

/// Applies a schema registry against a live storage backend at open time.
///
/// # Purpose
/// Owns iteration and ordering of the upgrade: reads the store's
/// last-persisted version, filters the registry down to the versions still
/// to apply, and hands each one to the backend as a single atomic unit
/// (definitions + transform + version bump). The driver implements no
/// partial-commit recovery of its own; it relies on the backend's
/// transaction semantics and aborts the open on the first failure.
///
/// # Characteristics
/// - A fresh store gets every version's table definitions with transforms
///   stripped: there are no prior records to migrate
/// - A store already at the target version is a no-op
/// - A store persisted above the target version fails the open; the
///   version sequence only moves forward
pub struct MigrationDriver {
    store: Store,
}

impl MigrationDriver {
    pub fn new(store: Store) -> Self {
        MigrationDriver { store }
    }

    /// Runs the migration sequence, leaving the store at the registry's
    /// highest version.
    ///
    /// # Errors
    /// `MigrationError` if the persisted version is above the target or if
    /// any migration unit fails; in the latter case the store remains at
    /// its last successfully committed version and must not be used.
    pub fn run(&self, registry: &SchemaRegistry) -> StoreResult<()> {
        let target = registry.latest_version();
        let persisted = self.store.persisted_version()?;

        let persisted = match persisted {
            None => {
                // Fresh store: apply definitions only, nothing to migrate.
                log::info!("Creating fresh store at schema version {}", target);
                for spec in registry.versions() {
                    self.store.apply_version(&spec.without_transform())?;
                }
                return Ok(());
            }
            Some(version) => version,
        };

        if persisted == target {
            log::debug!("Store already at schema version {}", target);
            return Ok(());
        }

        if persisted > target {
            return Err(StoreError::new(
                &format!(
                    "Store is persisted at version {} but the registry only declares up to {}",
                    persisted, target
                ),
                ErrorKind::MigrationError,
            ));
        }

        let path = registry.upgrade_path(persisted, target);
        log::info!(
            "Upgrading store from schema version {} to {} in {} step(s)",
            persisted,
            target,
            path.len()
        );

        for spec in &path {
            log::debug!(
                "Applying schema version {} ({} table(s), transform: {})",
                spec.version(),
                spec.tables().len(),
                spec.transform().is_some()
            );
            self.store.apply_version(spec)?;
        }

        Ok(())
    }
}
