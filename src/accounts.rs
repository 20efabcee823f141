//! User accounts and the device's session identity.
//!
//! The session slot is the authoritative answer to "who is logged in here".
//! It lives under its own storage key, outside the aggregate, and may name a
//! user that is not (or no longer) in the user table. Navigation and auth
//! helpers should read it through [`DataManager::current_session_user`] rather
//! than keeping their own copy.

use log::warn;

use crate::ids::{self, USER_PREFIX};
use crate::local_store::{KeyValueStore, StoreError};
use crate::manager::DataManager;
use crate::model::{self, non_empty, NewUser, User, UserStatus};

impl<S: KeyValueStore> DataManager<S> {
    /// Appends a user. Emails are not checked for uniqueness.
    pub fn register_user(&mut self, new: NewUser) -> User {
        let user = User {
            id: ids::new_id(USER_PREFIX),
            email: new.email,
            name: new.name,
            phone: new.phone.unwrap_or_default(),
            role: non_empty(new.role).unwrap_or_default(),
            created_at: Some(model::now()),
            status: UserStatus::Active,
        };
        self.data.users.push(user.clone());
        self.commit();
        user
    }

    pub fn list_users(&self) -> Vec<User> {
        self.data.users.clone()
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.data.users.iter().find(|u| u.id == user_id).cloned()
    }

    /// First registered user with this exact email.
    pub fn get_user_by_email(&self, email: &str) -> Option<User> {
        self.data.users.iter().find(|u| u.email == email).cloned()
    }

    /// Reads the session slot. Missing or unreadable reads as logged out.
    pub fn current_session_user(&self) -> Option<User> {
        let key = &self.config.session_key;
        match self.store.get(key) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Session slot '{key}' is unreadable, treating as logged out: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Could not read session slot '{key}': {e}");
                None
            }
        }
    }

    /// `None` logs the device out.
    pub fn set_current_session_user(&mut self, user: Option<&User>) -> Result<(), StoreError> {
        match user {
            Some(user) => {
                let json = serde_json::to_string(user)?;
                self.store.set(&self.config.session_key, &json)
            }
            None => self.store.remove(&self.config.session_key),
        }
    }
}
