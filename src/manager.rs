//! The data manager handle: load, persist, and the read-only views that span
//! every collection.
//!
//! Entity operations live next to their entities (`taxonomy`, `listings`,
//! `accounts`, `messages`) as further `impl` blocks on [`DataManager`].
//!
//! # Lifecycle
//!
//! [`DataManager::open`] is the one initializer. It reads the aggregate slot
//! once; from then on the in-memory [`AppData`] is the only source of truth and
//! storage is only written, never re-read (unless the host asks for
//! [`DataManager::reload`]).
//!
//! Every mutation writes the full aggregate back. A failed write is logged and
//! leaves memory ahead of storage; [`DataManager::has_unsaved_changes`] reports
//! that state and [`DataManager::persist`] retries it.
//!
//! Several processes may share one store. There is no locking between them:
//! the last full-aggregate write wins.

use log::{error, info, warn};

use crate::config::ManagerConfig;
use crate::local_store::{KeyValueStore, StoreError};
use crate::model::{AppData, ListingStatus, Settings, Stats};
use crate::seed;

/// How the aggregate came to be in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Decoded from storage as-is.
    Loaded,
    /// Storage had no aggregate; the default taxonomy was written.
    Seeded,
    /// Storage held something unreadable; the default taxonomy replaced it.
    Recovered,
}

pub struct DataManager<S: KeyValueStore> {
    pub(crate) store: S,
    pub(crate) config: ManagerConfig,
    pub(crate) data: AppData,
    dirty: bool,
    load_outcome: LoadOutcome,
}

impl<S: KeyValueStore> DataManager<S> {
    /// Loads the aggregate from `store`, seeding it if missing or corrupt.
    ///
    /// Never fails: an unreadable store degrades to the default taxonomy.
    pub fn open(store: S, config: ManagerConfig) -> Self {
        let mut manager = Self {
            store,
            config,
            data: AppData::default(),
            dirty: false,
            load_outcome: LoadOutcome::Seeded,
        };
        manager.initialize();
        manager
    }

    fn initialize(&mut self) {
        let key = self.config.data_key.clone();

        let outcome = match self.store.get(&key) {
            Ok(Some(json)) => match serde_json::from_str::<AppData>(&json) {
                Ok(data) => {
                    info!(
                        "Loaded aggregate '{key}': {} categories, {} listings, {} users",
                        data.categories.len(),
                        data.listings.len(),
                        data.users.len()
                    );
                    if !data.unreadable.is_empty() {
                        warn!(
                            "{} stored records did not decode; keeping them verbatim",
                            data.unreadable.len()
                        );
                    }
                    self.data = data;
                    self.dirty = false;
                    LoadOutcome::Loaded
                }
                Err(e) => {
                    error!("Stored aggregate '{key}' is corrupt, reseeding: {e}");
                    self.back_up_unreadable(&json);
                    LoadOutcome::Recovered
                }
            },
            Ok(None) => {
                info!("No aggregate under '{key}', seeding default taxonomy");
                LoadOutcome::Seeded
            }
            Err(e) => {
                error!("Could not read aggregate '{key}', reseeding: {e}");
                LoadOutcome::Recovered
            }
        };

        if outcome != LoadOutcome::Loaded {
            self.data = seed::default_app_data();
            self.commit();
        }
        self.load_outcome = outcome;
    }

    /// Copies bytes that are about to be replaced by the seed into the backup slot.
    fn back_up_unreadable(&mut self, json: &str) {
        let backup_key = self.config.backup_key.clone();
        match self.store.set(&backup_key, json) {
            Ok(()) => warn!("Unreadable aggregate saved under '{backup_key}'"),
            Err(e) => error!("Could not back up unreadable aggregate to '{backup_key}': {e}"),
        }
    }

    /// Discards in-memory state and loads the aggregate slot again.
    pub fn reload(&mut self) -> LoadOutcome {
        self.initialize();
        self.load_outcome
    }

    /// Writes the full aggregate. Memory is left untouched on failure.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        let json = match serde_json::to_string(&self.data) {
            Ok(json) => json,
            Err(e) => {
                self.dirty = true;
                return Err(e.into());
            }
        };

        match self.store.set(&self.config.data_key, &json) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                Err(e)
            }
        }
    }

    /// Persists after a mutation; failures are logged, not returned.
    pub(crate) fn commit(&mut self) -> bool {
        match self.persist() {
            Ok(()) => true,
            Err(e) => {
                warn!("Persist failed, in-memory state is ahead of storage: {e}");
                false
            }
        }
    }

    /// True when the last write failed and memory differs from storage.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.load_outcome
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn settings(&self) -> Settings {
        self.data.settings.clone()
    }

    /// A copy of the whole aggregate.
    pub fn snapshot(&self) -> AppData {
        self.data.clone()
    }

    pub fn stats(&self) -> Stats {
        let count_status = |status: ListingStatus| {
            self.data
                .listings
                .iter()
                .filter(|l| l.status.as_ref() == Some(&status))
                .count()
        };

        Stats {
            total_categories: self.data.categories.len(),
            total_listings: self.data.listings.len(),
            active_listings: count_status(ListingStatus::Active),
            total_users: self.data.users.len(),
            pending_listings: count_status(ListingStatus::Pending),
        }
    }

    /// Gives the storage backend back, e.g. to reopen it with another manager.
    pub fn into_store(self) -> S {
        self.store
    }
}
