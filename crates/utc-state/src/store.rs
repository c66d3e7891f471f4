//! StateStore — redb-backed feature persistence.
//!
//! Every operation runs in its own transaction and releases it before
//! returning, so the store holds no per-caller connection state. The store
//! supports both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Narrow persistence interface consumed by the protection service.
///
/// Implementations must make `load` and `save` atomic per unit: a `load`
/// returns either the previous or the next complete feature, never a mix.
pub trait FeatureStore: Send + Sync {
    /// Fetch the feature for a unit, if one exists.
    fn load(&self, unit: &str) -> StateResult<Option<Feature>>;

    /// Insert or overwrite a feature.
    fn save(&self, feature: &Feature) -> StateResult<()>;

    /// All stored features, in key order.
    fn list(&self) -> StateResult<Vec<Feature>>;

    /// Delete a unit's feature. Returns true if it existed.
    fn remove(&self, unit: &str) -> StateResult<bool>;
}

/// Thread-safe feature store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "feature store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory feature store opened");
        Ok(store)
    }

    /// Create the features table if it doesn't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(FEATURES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Insert or update a feature.
    pub fn put_feature(&self, feature: &Feature) -> StateResult<()> {
        let key = feature.table_key();
        let value = serde_json::to_vec(feature).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(FEATURES).map_err(map_err!(Table))?;
            table.insert(key, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(unit = %key, "feature stored");
        Ok(())
    }

    /// Get a feature by unit identifier.
    pub fn get_feature(&self, unit: &str) -> StateResult<Option<Feature>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(FEATURES).map_err(map_err!(Table))?;
        match table.get(unit).map_err(map_err!(Read))? {
            Some(guard) => {
                let feature: Feature =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(feature))
            }
            None => Ok(None),
        }
    }

    /// List all features.
    pub fn list_features(&self) -> StateResult<Vec<Feature>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(FEATURES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let feature: Feature =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(feature);
        }
        Ok(results)
    }

    /// Delete a feature by unit. Returns true if it existed.
    pub fn delete_feature(&self, unit: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(FEATURES).map_err(map_err!(Table))?;
            existed = table.remove(unit).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%unit, existed, "feature deleted");
        Ok(existed)
    }
}

impl FeatureStore for StateStore {
    fn load(&self, unit: &str) -> StateResult<Option<Feature>> {
        self.get_feature(unit)
    }

    fn save(&self, feature: &Feature) -> StateResult<()> {
        self.put_feature(feature)
    }

    fn list(&self) -> StateResult<Vec<Feature>> {
        self.list_features()
    }

    fn remove(&self, unit: &str) -> StateResult<bool> {
        self.delete_feature(unit)
    }
}
