//! Entity id generation.
//!
//! Ids look like `listing_0190f3c2-...`: a type prefix plus a UUIDv7. Within one
//! process the v7 generator is monotonic, so ids created in the same
//! millisecond still differ and still sort by creation time.

use uuid::Uuid;

pub const CATEGORY_PREFIX: &str = "cat";
pub const SUBCATEGORY_PREFIX: &str = "sub";
pub const FIELD_PREFIX: &str = "f";
pub const LISTING_PREFIX: &str = "listing";
pub const USER_PREFIX: &str = "user";
pub const MESSAGE_PREFIX: &str = "msg";

pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::now_v7())
}
