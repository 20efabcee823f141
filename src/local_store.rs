//! Durable key/value slots backing the data manager.
//!
//! The manager only ever needs a handful of string slots (the aggregate, the
//! session user), so the storage seam is a tiny trait. [`LmdbStore`] is the
//! durable backend; [`MemoryStore`] is a volatile one for hosts without a
//! filesystem and for tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info};
use thiserror::Error;

use crate::config::ManagerConfig;

const MAIN_DB: &str = "slots";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("LMDB error: {0}")]
    Lmdb(#[from] lmdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored value under '{0}' is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("storage is unavailable: {0}")]
    Unavailable(String),
}

/// String slots addressed by fixed keys.
///
/// Each call is atomic on its own; there is no multi-key transaction.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// LMDB-backed slots, one named database inside one environment.
pub struct LmdbStore {
    env: Environment,
    db: Database,
}

impl LmdbStore {
    /// Opens (or creates) `<config.db_name>.lmdb`.
    pub fn init(config: &ManagerConfig) -> Result<Self, StoreError> {
        let dir = config.lmdb_dir();
        let path = Path::new(&dir);
        if !path.exists() {
            info!("Creating LMDB directory at: {dir}");
            std::fs::create_dir_all(path)?;
        }

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(config.map_size)
            .open(path)?;
        let db = env.create_db(Some(MAIN_DB), DatabaseFlags::empty())?;

        info!("LMDB store opened at: {dir}");
        Ok(Self { env, db })
    }

    /// Drops every slot. Used when a host wants a factory reset.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.clear_db(self.db)?;
        txn.commit()?;
        Ok(())
    }
}

impl KeyValueStore for LmdbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let txn = self.env.begin_ro_txn()?;
        let bytes = match txn.get(self.db, &key) {
            Ok(bytes) => bytes.to_vec(),
            Err(lmdb::Error::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        txn.abort();

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| StoreError::InvalidUtf8(key.to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        debug!("Wrote {} bytes under '{key}'", value.len());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.db, &key, None) {
            Ok(()) | Err(lmdb::Error::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        txn.commit()?;
        Ok(())
    }
}

/// In-process slots.
///
/// Clones share the same slots, which is how tests model two tabs pointing
/// at one storage area. [`MemoryStore::set_writable`] simulates a full or
/// disabled store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Rc<RefCell<HashMap<String, String>>>,
    read_only: Rc<Cell<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_writable(&self, writable: bool) {
        self.read_only.set(!writable);
    }

    /// Raw slot contents, bypassing any manager.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }

    /// Writes a slot directly, e.g. to plant corrupt data.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.slots.borrow_mut().insert(key.to_string(), value.to_string());
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.read_only.get() {
            Err(StoreError::Unavailable("quota exceeded".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.put_raw(key, value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}
