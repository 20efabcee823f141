//! Buyer/seller messaging.

use crate::ids::{self, MESSAGE_PREFIX};
use crate::local_store::KeyValueStore;
use crate::manager::DataManager;
use crate::model::{self, strip_reserved, Message, NewMessage, RESERVED_MESSAGE_KEYS};

impl<S: KeyValueStore> DataManager<S> {
    pub fn send_message(&mut self, new: NewMessage) -> Message {
        let mut extra = new.extra;
        strip_reserved(&mut extra, &RESERVED_MESSAGE_KEYS);

        let message = Message {
            id: ids::new_id(MESSAGE_PREFIX),
            from_user_id: new.from_user_id,
            to_user_id: new.to_user_id,
            listing_id: new.listing_id,
            body: new.body,
            created_at: Some(model::now()),
            read: false,
            extra,
        };
        self.data.messages.push(message.clone());
        self.commit();
        message
    }

    /// Messages sent or received by `user_id`, in storage order.
    pub fn messages_for_user(&self, user_id: &str) -> Vec<Message> {
        self.data
            .messages
            .iter()
            .filter(|m| m.from_user_id == user_id || m.to_user_id == user_id)
            .cloned()
            .collect()
    }

    /// Returns whether the message exists. Unknown ids change nothing.
    pub fn mark_message_read(&mut self, message_id: &str) -> bool {
        let Some(message) = self.data.messages.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };
        message.read = true;
        self.commit();
        true
    }
}
