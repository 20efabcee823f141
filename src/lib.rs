//! # Classifieds Core
//!
//! Local-first data manager for a classified-ads site. It owns the category →
//! subcategory → field taxonomy that drives the listing forms, plus listings,
//! users and messages, and keeps all of it in one aggregate persisted to LMDB
//! after every change.
//!
//! ## Features
//!
//! - **One aggregate, one write**: every mutation persists the full snapshot
//! - **Self-healing load**: missing or corrupt storage falls back to a seeded taxonomy
//! - **Copy-out reads**: callers never hold references into manager state
//! - **Strictly unique ids**: prefixed UUIDv7, collision-free within a millisecond
//! - **FFI surface**: C-compatible functions exchanging JSON for UI hosts
//!
//! ## Quick Start
//!
//! ```rust
//! use classifieds_core::config::ManagerConfig;
//! use classifieds_core::local_store::MemoryStore;
//! use classifieds_core::manager::DataManager;
//! use classifieds_core::model::{NewCategory, NewSubcategory};
//!
//! let mut manager = DataManager::open(MemoryStore::new(), ManagerConfig::default());
//!
//! let books = manager.create_category(NewCategory { name: "Books".into(), icon: None });
//! assert_eq!(books.slug, "books");
//!
//! let sci_fi = manager
//!     .create_subcategory(&books.id, NewSubcategory { name: "Sci Fi".into() })
//!     .expect("parent exists");
//! assert_eq!(sci_fi.slug, "sci-fi");
//! ```
//!
//! ## FFI Functions
//!
//! Every function taking a `state` expects the pointer returned by
//! [`create_manager`]. Results are JSON [`AppResponse`](app_response::AppResponse)
//! envelopes that must be released with [`free_response`].
//!
//! - Lifecycle: [`create_manager`], [`create_manager_with_config`], [`close_manager`],
//!   [`persist_data`], [`reload_data`], [`get_stats`], [`get_settings`]
//! - Categories: [`list_categories`], [`get_category`], [`get_category_by_slug`],
//!   [`create_category`], [`update_category`], [`delete_category`]
//! - Subcategories: [`list_subcategories`], [`get_subcategory`], [`create_subcategory`],
//!   [`update_subcategory`], [`delete_subcategory`]
//! - Fields: [`get_fields`], [`create_field`], [`update_field`], [`delete_field`]
//! - Listings: [`list_listings`], [`get_listing`], [`listings_by_category`],
//!   [`listings_by_user`], [`create_listing`], [`update_listing`], [`delete_listing`],
//!   [`search_listings`], [`filter_listings`]
//! - Users and session: [`register_user`], [`get_user`], [`get_user_by_email`],
//!   [`get_current_user`], [`set_current_user`]
//! - Messages: [`send_message`], [`messages_for_user`], [`mark_message_read`]

pub mod accounts;
pub mod app_response;
pub mod config;
pub mod ids;
pub mod listings;
pub mod local_store;
pub mod manager;
pub mod messages;
pub mod model;
pub mod seed;
pub mod taxonomy;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::app_response::AppResponse;
use crate::config::ManagerConfig;
use crate::listings::ListingFilter;
use crate::local_store::LmdbStore;
use crate::manager::DataManager;
use crate::model::{
    CategoryPatch, FieldPatch, ListingPatch, NewCategory, NewField, NewListing, NewMessage,
    NewSubcategory, NewUser, SubcategoryPatch, User,
};

/// The manager type handed across the FFI boundary.
pub type ManagerHandle = DataManager<LmdbStore>;

/// Opens the data manager backed by `<name>.lmdb`.
///
/// Loading happens here, once: an existing aggregate is adopted, a missing or
/// corrupt one is replaced by the default taxonomy and written back.
///
/// # Parameters
///
/// * `name` - A null-terminated C string containing the database name
///
/// # Returns
///
/// A pointer to the manager on success, or a null pointer on failure. Release
/// it with [`close_manager`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use classifieds_core::{close_manager, create_manager, free_response};
///
/// let name = CString::new("classifieds").unwrap();
/// let state = create_manager(name.as_ptr());
/// assert!(!state.is_null());
///
/// free_response(close_manager(state));
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_manager(name: *const c_char) -> *mut ManagerHandle {
    let name = match c_ptr_to_string(name, "name") {
        Ok(name) => name,
        Err(e) => {
            warn!("create_manager rejected its argument: {e}");
            return std::ptr::null_mut();
        }
    };

    open_manager(ManagerConfig::default().with_db_name(name))
}

/// Like [`create_manager`], taking a JSON [`ManagerConfig`]; omitted keys keep
/// their defaults.
///
/// ```json
/// { "db_name": "classifieds", "data_key": "zipzapzoi_data", "map_size": 10485760 }
/// ```
///
/// # Parameters
///
/// * `config_json` - Null-terminated JSON object with any [`ManagerConfig`] keys
///
/// # Returns
///
/// A pointer to the manager, or a null pointer if the JSON is invalid or the
/// storage cannot be opened.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_manager_with_config(config_json: *const c_char) -> *mut ManagerHandle {
    let config = match parse_json_arg::<ManagerConfig>(config_json, "config") {
        Ok(config) => config,
        Err(e) => {
            warn!("create_manager_with_config rejected its argument: {e}");
            return std::ptr::null_mut();
        }
    };

    open_manager(config)
}

fn open_manager(config: ManagerConfig) -> *mut ManagerHandle {
    info!("Attempting to open data manager at: {}", config.lmdb_dir());

    match LmdbStore::init(&config) {
        Ok(store) => {
            let manager = DataManager::open(store, config);
            info!("✅ Data manager ready ({:?})", manager.load_outcome());
            Box::into_raw(Box::new(manager))
        }
        Err(e) => {
            warn!("❌ Failed to open storage at {}: {e}", config.lmdb_dir());
            std::ptr::null_mut()
        }
    }
}

/// Releases a manager created by [`create_manager`].
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]; must not be used afterwards
///
/// # Returns
///
/// `Ok` when closed cleanly, `DatabaseError` when the last write failed and
/// unsaved changes were dropped, `BadRequest` for a null pointer.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_manager(state: *mut ManagerHandle) -> *const c_char {
    if state.is_null() {
        let error = AppResponse::BadRequest("Null state pointer passed to close_manager".to_string());
        return response_to_c_string(&error);
    }

    let manager = unsafe { Box::from_raw(state) };
    let response = if manager.has_unsaved_changes() {
        AppResponse::DatabaseError("Closed with unsaved changes".to_string())
    } else {
        AppResponse::success("Data manager closed successfully")
    };
    drop(manager);
    response_to_c_string(&response)
}

/// Frees a string returned by any function in this crate. Null is ignored.
///
/// # Parameters
///
/// * `ptr` - A response string previously returned by this crate
///
/// # Safety
///
/// The pointer must come from this crate and must not be freed twice.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

/// Retries writing the aggregate, e.g. after a failed write left
/// unsaved changes.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
///
/// # Returns
///
/// `Ok` once the aggregate is written, `DatabaseError` otherwise.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn persist_data(state: *mut ManagerHandle) -> *const c_char {
    with_manager(state, "persist_data", |m| {
        m.persist()?;
        Ok(AppResponse::success("Data persisted"))
    })
}

/// Discards in-memory state and reads the aggregate slot again.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
///
/// # Returns
///
/// `Ok` with `{"outcome": "Loaded" | "Seeded" | "Recovered"}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn reload_data(state: *mut ManagerHandle) -> *const c_char {
    with_manager(state, "reload_data", |m| {
        let outcome = m.reload();
        Ok(AppResponse::json(&json!({ "outcome": format!("{outcome:?}") })))
    })
}

/// Dashboard counters.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
///
/// # Returns
///
/// `Ok` with `{"totalCategories", "totalListings", "activeListings",
/// "totalUsers", "pendingListings"}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_stats(state: *mut ManagerHandle) -> *const c_char {
    with_manager(state, "get_stats", |m| Ok(AppResponse::json(&m.stats())))
}

/// Site settings stored in the aggregate.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
///
/// # Returns
///
/// `Ok` with `{"siteName", "currency", "adminEmail"}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_settings(state: *mut ManagerHandle) -> *const c_char {
    with_manager(state, "get_settings", |m| Ok(AppResponse::json(&m.settings())))
}

// ===== CATEGORIES =====

/// All categories in insertion order, with their subcategories and fields.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
///
/// # Returns
///
/// `Ok` with a JSON array of categories.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_categories(state: *mut ManagerHandle) -> *const c_char {
    with_manager(state, "list_categories", |m| Ok(AppResponse::json(&m.list_categories())))
}

/// Looks up a category by id.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `id` - Null-terminated category id
///
/// # Returns
///
/// `Ok` with the category, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_category(state: *mut ManagerHandle, id: *const c_char) -> *const c_char {
    with_manager(state, "get_category", |m| {
        let id = c_ptr_to_string(id, "id")?;
        Ok(AppResponse::found(m.get_category(&id), format!("category with id: {id}")))
    })
}

/// Looks up a category by slug; the first match wins.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `slug` - Null-terminated slug, e.g. `real-estate`
///
/// # Returns
///
/// `Ok` with the category, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_category_by_slug(state: *mut ManagerHandle, slug: *const c_char) -> *const c_char {
    with_manager(state, "get_category_by_slug", |m| {
        let slug = c_ptr_to_string(slug, "slug")?;
        Ok(AppResponse::found(m.get_category_by_slug(&slug), format!("category with slug: {slug}")))
    })
}

/// Creates a category from `{"name": "...", "icon": "..."}`; `icon` is optional.
/// The slug is derived from the name.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `json_ptr` - Null-terminated JSON object
///
/// # Returns
///
/// `Ok` with the stored category, `SerializationError` for malformed JSON.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_category(state: *mut ManagerHandle, json_ptr: *const c_char) -> *const c_char {
    with_manager(state, "create_category", |m| {
        let new: NewCategory = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::json(&m.create_category(new)))
    })
}

/// Shallow-merges `{"name", "icon", "slug"}` into a category.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `id` - Null-terminated category id
/// * `json_ptr` - Null-terminated JSON patch
///
/// # Returns
///
/// `Ok` with the updated category, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_category(
    state: *mut ManagerHandle,
    id: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    with_manager(state, "update_category", |m| {
        let id = c_ptr_to_string(id, "id")?;
        let patch: CategoryPatch = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::found(m.update_category(&id, patch), format!("category with id: {id}")))
    })
}

/// Deletes a category with everything under it.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `id` - Null-terminated category id
///
/// # Returns
///
/// `Ok` with `{"removed": bool}`; deleting an absent id is not an error.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_category(state: *mut ManagerHandle, id: *const c_char) -> *const c_char {
    with_manager(state, "delete_category", |m| {
        let id = c_ptr_to_string(id, "id")?;
        Ok(removed(m.delete_category(&id)))
    })
}

// ===== SUBCATEGORIES =====

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated category id
///
/// # Returns
///
/// `Ok` with a JSON array, empty when the category does not exist.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_subcategories(state: *mut ManagerHandle, category_id: *const c_char) -> *const c_char {
    with_manager(state, "list_subcategories", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        Ok(AppResponse::json(&m.list_subcategories(&category_id)))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated category id
/// * `subcategory_id` - Null-terminated subcategory id
///
/// # Returns
///
/// `Ok` with the subcategory, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_subcategory(
    state: *mut ManagerHandle,
    category_id: *const c_char,
    subcategory_id: *const c_char,
) -> *const c_char {
    with_manager(state, "get_subcategory", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        let subcategory_id = c_ptr_to_string(subcategory_id, "subcategory_id")?;
        Ok(AppResponse::found(
            m.get_subcategory(&category_id, &subcategory_id),
            format!("subcategory {subcategory_id} in category {category_id}"),
        ))
    })
}

/// Adds a subcategory from `{"name": "..."}`.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated id of the parent category
/// * `json_ptr` - Null-terminated JSON object
///
/// # Returns
///
/// `Ok` with the subcategory, or `NotFound` when the parent category does not exist.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_subcategory(
    state: *mut ManagerHandle,
    category_id: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    with_manager(state, "create_subcategory", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        let new: NewSubcategory = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::found(
            m.create_subcategory(&category_id, new),
            format!("category with id: {category_id}"),
        ))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated category id
/// * `subcategory_id` - Null-terminated subcategory id
/// * `json_ptr` - Null-terminated JSON patch with `name` and/or `slug`
///
/// # Returns
///
/// `Ok` with the updated subcategory, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_subcategory(
    state: *mut ManagerHandle,
    category_id: *const c_char,
    subcategory_id: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    with_manager(state, "update_subcategory", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        let subcategory_id = c_ptr_to_string(subcategory_id, "subcategory_id")?;
        let patch: SubcategoryPatch = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::found(
            m.update_subcategory(&category_id, &subcategory_id, patch),
            format!("subcategory {subcategory_id} in category {category_id}"),
        ))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated category id
/// * `subcategory_id` - Null-terminated subcategory id
///
/// # Returns
///
/// `Ok` with `{"removed": bool}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_subcategory(
    state: *mut ManagerHandle,
    category_id: *const c_char,
    subcategory_id: *const c_char,
) -> *const c_char {
    with_manager(state, "delete_subcategory", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        let subcategory_id = c_ptr_to_string(subcategory_id, "subcategory_id")?;
        Ok(removed(m.delete_subcategory(&category_id, &subcategory_id)))
    })
}

// ===== FIELDS =====

/// Field descriptors of a subcategory.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated category id
/// * `subcategory_id` - Null-terminated subcategory id
///
/// # Returns
///
/// `Ok` with a JSON array, empty when the subcategory does not resolve.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_fields(
    state: *mut ManagerHandle,
    category_id: *const c_char,
    subcategory_id: *const c_char,
) -> *const c_char {
    with_manager(state, "get_fields", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        let subcategory_id = c_ptr_to_string(subcategory_id, "subcategory_id")?;
        Ok(AppResponse::json(&m.get_fields_by_subcategory(&category_id, &subcategory_id)))
    })
}

/// Adds a field from
/// `{"label": "...", "type": "select", "required": true, "placeholder": "...", "options": [...]}`.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated category id
/// * `subcategory_id` - Null-terminated subcategory id
/// * `json_ptr` - Null-terminated JSON object
///
/// # Returns
///
/// `Ok` with the field, or `NotFound` when the subcategory does not resolve.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_field(
    state: *mut ManagerHandle,
    category_id: *const c_char,
    subcategory_id: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    with_manager(state, "create_field", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        let subcategory_id = c_ptr_to_string(subcategory_id, "subcategory_id")?;
        let new: NewField = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::found(
            m.create_field(&category_id, &subcategory_id, new),
            format!("subcategory {subcategory_id} in category {category_id}"),
        ))
    })
}

/// Shallow-merges a patch into one field descriptor.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated category id
/// * `subcategory_id` - Null-terminated subcategory id
/// * `field_id` - Null-terminated field id
/// * `json_ptr` - Null-terminated JSON patch
///
/// # Returns
///
/// `Ok` with the updated field, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_field(
    state: *mut ManagerHandle,
    category_id: *const c_char,
    subcategory_id: *const c_char,
    field_id: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    with_manager(state, "update_field", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        let subcategory_id = c_ptr_to_string(subcategory_id, "subcategory_id")?;
        let field_id = c_ptr_to_string(field_id, "field_id")?;
        let patch: FieldPatch = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::found(
            m.update_field(&category_id, &subcategory_id, &field_id, patch),
            format!("field {field_id} in subcategory {subcategory_id}"),
        ))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated category id
/// * `subcategory_id` - Null-terminated subcategory id
/// * `field_id` - Null-terminated field id
///
/// # Returns
///
/// `Ok` with `{"removed": bool}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_field(
    state: *mut ManagerHandle,
    category_id: *const c_char,
    subcategory_id: *const c_char,
    field_id: *const c_char,
) -> *const c_char {
    with_manager(state, "delete_field", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        let subcategory_id = c_ptr_to_string(subcategory_id, "subcategory_id")?;
        let field_id = c_ptr_to_string(field_id, "field_id")?;
        Ok(removed(m.delete_field(&category_id, &subcategory_id, &field_id)))
    })
}

// ===== LISTINGS =====

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
///
/// # Returns
///
/// `Ok` with every listing in storage order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_listings(state: *mut ManagerHandle) -> *const c_char {
    with_manager(state, "list_listings", |m| Ok(AppResponse::json(&m.list_listings())))
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `id` - Null-terminated listing id
///
/// # Returns
///
/// `Ok` with the listing, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_listing(state: *mut ManagerHandle, id: *const c_char) -> *const c_char {
    with_manager(state, "get_listing", |m| {
        let id = c_ptr_to_string(id, "id")?;
        Ok(AppResponse::found(m.get_listing(&id), format!("listing with id: {id}")))
    })
}

/// Listings whose `categoryId` equals the given id; the category need not exist.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `category_id` - Null-terminated category id
///
/// # Returns
///
/// `Ok` with a JSON array.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn listings_by_category(state: *mut ManagerHandle, category_id: *const c_char) -> *const c_char {
    with_manager(state, "listings_by_category", |m| {
        let category_id = c_ptr_to_string(category_id, "category_id")?;
        Ok(AppResponse::json(&m.listings_by_category(&category_id)))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `user_id` - Null-terminated user id
///
/// # Returns
///
/// `Ok` with a JSON array.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn listings_by_user(state: *mut ManagerHandle, user_id: *const c_char) -> *const c_char {
    with_manager(state, "listings_by_user", |m| {
        let user_id = c_ptr_to_string(user_id, "user_id")?;
        Ok(AppResponse::json(&m.listings_by_user(&user_id)))
    })
}

/// Creates a listing. Unknown keys in the JSON (brand, mileage, ...) are kept
/// on the listing; `id`, `createdAt` and `views` are always assigned here.
/// An absent or empty `status` becomes `pending`.
///
/// ```json
/// { "title": "Red Bike", "price": 100, "categoryId": "cat_vehicles", "condition": "Used" }
/// ```
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `json_ptr` - Null-terminated JSON object
///
/// # Returns
///
/// `Ok` with the stored listing, `SerializationError` for malformed JSON.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_listing(state: *mut ManagerHandle, json_ptr: *const c_char) -> *const c_char {
    with_manager(state, "create_listing", |m| {
        let new: NewListing = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::json(&m.create_listing(new)))
    })
}

/// Shallow-merges a patch into a listing and stamps `updatedAt`.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `id` - Null-terminated listing id
/// * `json_ptr` - Null-terminated JSON patch
///
/// # Returns
///
/// `Ok` with the updated listing, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_listing(
    state: *mut ManagerHandle,
    id: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    with_manager(state, "update_listing", |m| {
        let id = c_ptr_to_string(id, "id")?;
        let patch: ListingPatch = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::found(m.update_listing(&id, patch), format!("listing with id: {id}")))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `id` - Null-terminated listing id
///
/// # Returns
///
/// `Ok` with `{"removed": bool}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_listing(state: *mut ManagerHandle, id: *const c_char) -> *const c_char {
    with_manager(state, "delete_listing", |m| {
        let id = c_ptr_to_string(id, "id")?;
        Ok(removed(m.delete_listing(&id)))
    })
}

/// Case-insensitive substring search over title and description.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `query` - Null-terminated query; empty matches everything
///
/// # Returns
///
/// `Ok` with matching listings in storage order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn search_listings(state: *mut ManagerHandle, query: *const c_char) -> *const c_char {
    with_manager(state, "search_listings", |m| {
        let query = c_ptr_to_string(query, "query")?;
        Ok(AppResponse::json(&m.search_listings(&query)))
    })
}

/// Filters listings by
/// `{"categoryId", "subcategoryId", "minPrice", "maxPrice", "status"}`, all optional.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `json_ptr` - Null-terminated JSON criteria; `{}` matches everything
///
/// # Returns
///
/// `Ok` with matching listings in storage order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn filter_listings(state: *mut ManagerHandle, json_ptr: *const c_char) -> *const c_char {
    with_manager(state, "filter_listings", |m| {
        let filter: ListingFilter = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::json(&m.filter_listings(&filter)))
    })
}

// ===== USERS & SESSION =====

/// Registers a user from `{"email", "name", "phone"?, "role"?}`.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `json_ptr` - Null-terminated JSON object
///
/// # Returns
///
/// `Ok` with the stored user. Emails are not checked for uniqueness.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn register_user(state: *mut ManagerHandle, json_ptr: *const c_char) -> *const c_char {
    with_manager(state, "register_user", |m| {
        let new: NewUser = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::json(&m.register_user(new)))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `id` - Null-terminated user id
///
/// # Returns
///
/// `Ok` with the user, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_user(state: *mut ManagerHandle, id: *const c_char) -> *const c_char {
    with_manager(state, "get_user", |m| {
        let id = c_ptr_to_string(id, "id")?;
        Ok(AppResponse::found(m.get_user(&id), format!("user with id: {id}")))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `email` - Null-terminated email, matched exactly
///
/// # Returns
///
/// `Ok` with the first matching user, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_user_by_email(state: *mut ManagerHandle, email: *const c_char) -> *const c_char {
    with_manager(state, "get_user_by_email", |m| {
        let email = c_ptr_to_string(email, "email")?;
        Ok(AppResponse::found(m.get_user_by_email(&email), format!("user with email: {email}")))
    })
}

/// The logged-in user of this device.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
///
/// # Returns
///
/// `Ok` with the session user, or `NotFound` when logged out.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_current_user(state: *mut ManagerHandle) -> *const c_char {
    with_manager(state, "get_current_user", |m| {
        Ok(AppResponse::found(m.current_session_user(), "session user"))
    })
}

/// Stores the session user.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `json_ptr` - Null-terminated user JSON, or null to log out
///
/// # Returns
///
/// `Ok` with the stored user or a confirmation, `DatabaseError` when the write fails.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn set_current_user(state: *mut ManagerHandle, json_ptr: *const c_char) -> *const c_char {
    with_manager(state, "set_current_user", |m| {
        if json_ptr.is_null() {
            m.set_current_session_user(None)?;
            return Ok(AppResponse::success("Session cleared"));
        }
        let user: User = parse_json_arg(json_ptr, "JSON")?;
        m.set_current_session_user(Some(&user))?;
        Ok(AppResponse::json(&user))
    })
}

// ===== MESSAGES =====

/// Sends a message from `{"fromUserId", "toUserId", "listingId"?, "body"}`.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `json_ptr` - Null-terminated JSON object
///
/// # Returns
///
/// `Ok` with the stored message, unread.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn send_message(state: *mut ManagerHandle, json_ptr: *const c_char) -> *const c_char {
    with_manager(state, "send_message", |m| {
        let new: NewMessage = parse_json_arg(json_ptr, "JSON")?;
        Ok(AppResponse::json(&m.send_message(new)))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `user_id` - Null-terminated user id
///
/// # Returns
///
/// `Ok` with messages the user sent or received, in storage order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn messages_for_user(state: *mut ManagerHandle, user_id: *const c_char) -> *const c_char {
    with_manager(state, "messages_for_user", |m| {
        let user_id = c_ptr_to_string(user_id, "user_id")?;
        Ok(AppResponse::json(&m.messages_for_user(&user_id)))
    })
}

/// # Parameters
///
/// * `state` - Pointer returned by [`create_manager`]
/// * `id` - Null-terminated message id
///
/// # Returns
///
/// `Ok` when marked, `NotFound` for unknown ids.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn mark_message_read(state: *mut ManagerHandle, id: *const c_char) -> *const c_char {
    with_manager(state, "mark_message_read", |m| {
        let id = c_ptr_to_string(id, "id")?;
        if m.mark_message_read(&id) {
            Ok(AppResponse::success("Message marked as read"))
        } else {
            Ok(AppResponse::NotFound(format!("No message with id: {id}")))
        }
    })
}

// ===== HELPERS =====

/// Runs `op` against the manager behind `state` and serializes whatever
/// envelope it produces. Errors short-circuit through `?` as envelopes too.
fn with_manager<F>(state: *mut ManagerHandle, op_name: &str, op: F) -> *const c_char
where
    F: FnOnce(&mut ManagerHandle) -> Result<AppResponse, AppResponse>,
{
    let manager = match unsafe { state.as_mut() } {
        Some(m) => m,
        None => {
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {op_name}"));
            return response_to_c_string(&error);
        }
    };

    let response = match op(manager) {
        Ok(response) | Err(response) => response,
    };
    response_to_c_string(&response)
}

fn removed(removed: bool) -> AppResponse {
    AppResponse::json(&json!({ "removed": removed }))
}

/// Converts an [`AppResponse`] to a C string owned by the caller.
///
/// Returns a null pointer if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust String, rejecting null pointers and
/// invalid UTF-8 with a `BadRequest` naming `field_name`.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, AppResponse> {
    if ptr.is_null() {
        return Err(AppResponse::BadRequest(format!("Null {field_name} pointer")));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => Err(AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"))),
    }
}

fn parse_json_arg<T: DeserializeOwned>(ptr: *const c_char, field_name: &str) -> Result<T, AppResponse> {
    let json_str = c_ptr_to_string(ptr, field_name)?;
    serde_json::from_str(&json_str)
        .map_err(|e| AppResponse::SerializationError(format!("Invalid JSON: {e}")))
}
