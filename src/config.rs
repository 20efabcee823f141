//! Runtime configuration for a [`DataManager`](crate::manager::DataManager).
//!
//! Every field has a default, so hosts only spell out what they change:
//!
//! ```rust
//! use classifieds_core::config::ManagerConfig;
//!
//! let config = ManagerConfig::from_json(r#"{"db_name":"staging"}"#)?;
//! assert_eq!(config.db_name, "staging");
//! assert_eq!(config.data_key, "zipzapzoi_data");
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::{Deserialize, Serialize};

/// Storage key holding the serialized aggregate.
pub const DEFAULT_DATA_KEY: &str = "zipzapzoi_data";

/// Storage key holding the serialized current-session user.
pub const DEFAULT_SESSION_KEY: &str = "zipzapzoi_current_user";

/// Storage key receiving an unreadable aggregate before it is replaced.
pub const DEFAULT_BACKUP_KEY: &str = "zipzapzoi_data_backup";

/// Name of the LMDB environment; the directory on disk is `<db_name>.lmdb`.
pub const DEFAULT_DB_NAME: &str = "classifieds";

/// LMDB map size. The whole aggregate lives in one value, so this bounds it.
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Slot for the [`AppData`](crate::model::AppData) snapshot.
    pub data_key: String,
    /// Slot for the session user. Kept apart from the user table on purpose:
    /// the session may reference a user that no longer exists.
    pub session_key: String,
    /// Slot keeping the last aggregate that failed to decode.
    pub backup_key: String,
    pub db_name: String,
    pub map_size: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            data_key: DEFAULT_DATA_KEY.to_string(),
            session_key: DEFAULT_SESSION_KEY.to_string(),
            backup_key: DEFAULT_BACKUP_KEY.to_string(),
            db_name: DEFAULT_DB_NAME.to_string(),
            map_size: DEFAULT_MAP_SIZE,
        }
    }
}

impl ManagerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = name.into();
        self
    }

    /// Directory LMDB opens for this configuration.
    pub fn lmdb_dir(&self) -> String {
        format!("{}.lmdb", self.db_name)
    }
}
