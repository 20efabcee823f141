//! Entities persisted by the data manager.
//!
//! Everything here serializes to the camelCase JSON tree the site has always
//! stored, so an aggregate written by an older client decodes unchanged.
//! Missing collections decode as empty and unknown listing/message keys are
//! carried through untouched in `extra`.
//!
//! Enumerations that the UI extends freely (field types, listing status,
//! roles) are string-backed: known values get a variant, anything else is
//! kept verbatim in `Other`.
//!
//! Decoding is tolerant per record. Absent or `null` values read as the
//! field's default. A record that still does not decode is kept verbatim in
//! [`AppData::unreadable`] and written back in its place, so one odd record
//! never costs the rest of the aggregate.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Other(s) => s.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($text => $name::$variant,)+
                    _ => $name::Other(value),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name::from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(s) => s,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Input kind of a [`Field`].
    FieldType {
        Text => "text",
        Number => "number",
        Select => "select",
        Textarea => "textarea",
        Checkbox => "checkbox",
        Date => "date",
    }
}

string_enum! {
    ListingStatus {
        Pending => "pending",
        Active => "active",
        Sold => "sold",
        Rejected => "rejected",
        Expired => "expired",
    }
}

string_enum! {
    UserRole {
        Seller => "seller",
        Buyer => "buyer",
        Admin => "admin",
    }
}

string_enum! {
    UserStatus {
        Active => "active",
        Suspended => "suspended",
    }
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::Text
    }
}

impl Default for ListingStatus {
    fn default() -> Self {
        ListingStatus::Pending
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Seller
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Active
    }
}

// ===== DECODING HELPERS =====

/// Reads `null` as the type's default; absent values are covered by
/// `#[serde(default)]` on the field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Current time at the precision timestamps are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Timestamps are written the way browsers write `Date.toISOString()`:
/// UTC with millisecond precision.
mod iso_millis {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }
}

// ===== TAXONOMY =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subcategories: Vec<Subcategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<Field>,
}

/// Describes one form input shown when composing a listing.
///
/// `options` only matters for [`FieldType::Select`]; keeping it non-empty there
/// is the editor's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub placeholder: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewSubcategory {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewField {
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Shallow patch for a [`Category`]. `None` leaves the value alone; the slug
/// is never re-derived from a new name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubcategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldPatch {
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    pub required: Option<bool>,
    pub placeholder: Option<String>,
    pub options: Option<Vec<String>>,
}

impl CategoryPatch {
    pub(crate) fn apply_to(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name;
        }
        if let Some(icon) = self.icon {
            category.icon = icon;
        }
        if let Some(slug) = self.slug {
            category.slug = slug;
        }
    }
}

impl SubcategoryPatch {
    pub(crate) fn apply_to(self, subcategory: &mut Subcategory) {
        if let Some(name) = self.name {
            subcategory.name = name;
        }
        if let Some(slug) = self.slug {
            subcategory.slug = slug;
        }
    }
}

impl FieldPatch {
    pub(crate) fn apply_to(self, field: &mut Field) {
        if let Some(label) = self.label {
            field.label = label;
        }
        if let Some(field_type) = self.field_type {
            field.field_type = field_type;
        }
        if let Some(required) = self.required {
            field.required = required;
        }
        if let Some(placeholder) = self.placeholder {
            field.placeholder = placeholder;
        }
        if let Some(options) = self.options {
            field.options = options;
        }
    }
}

// ===== LISTINGS =====

/// A listing price exactly as stored.
///
/// Form code writes numbers or numeric strings, and older data may hold
/// anything else ("ask me"). The stored value is written back untouched;
/// [`Price::amount`] is the numeric reading used for filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(JsonValue);

impl Price {
    pub fn amount(&self) -> Option<f64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn raw(&self) -> &JsonValue {
        &self.0
    }
}

impl From<f64> for Price {
    /// Whole amounts are stored as integers, the way the browser writes them.
    fn from(amount: f64) -> Self {
        if amount.fract() == 0.0 && amount.abs() < 9_007_199_254_740_992.0 {
            Price(JsonValue::from(amount as i64))
        } else {
            Price(JsonValue::from(amount))
        }
    }
}

/// A classified ad.
///
/// `category_id`, `subcategory_id` and `user_id` are soft references: nothing
/// checks that they resolve, and readers must cope when they don't.
/// Subcategory-specific values (brand, mileage, ...) ride along in `extra`.
///
/// `status` and `price` are `None` only on records stored without them; the
/// manager always sets a status on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub views: u64,
    #[serde(default, serialize_with = "iso_millis::serialize", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, serialize_with = "iso_millis::serialize", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Listing {
    /// Numeric reading of the stored price, if it has one.
    pub fn price_amount(&self) -> Option<f64> {
        self.price.as_ref().and_then(Price::amount)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<f64>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub user_id: Option<String>,
    /// Defaults to [`ListingStatus::Pending`], also when empty.
    pub status: Option<ListingStatus>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Shallow patch for a [`Listing`]. Keys in `extra` overwrite or add extra
/// values; `id`, `createdAt` and `updatedAt` are owned by the manager and
/// ignored if present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<f64>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<ListingStatus>,
    pub views: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Keys the manager assigns itself; callers cannot smuggle them in via `extra`.
pub(crate) const RESERVED_LISTING_KEYS: [&str; 4] = ["id", "createdAt", "updatedAt", "views"];

pub(crate) const RESERVED_MESSAGE_KEYS: [&str; 3] = ["id", "createdAt", "read"];

pub(crate) fn strip_reserved(extra: &mut Map<String, JsonValue>, reserved: &[&str]) {
    extra.retain(|key, _| !reserved.contains(&key.as_str()));
}

impl ListingPatch {
    pub(crate) fn apply_to(self, listing: &mut Listing) {
        if let Some(title) = self.title {
            listing.title = title;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(price) = self.price {
            listing.price = Some(Price::from(price));
        }
        if let Some(category_id) = self.category_id {
            listing.category_id = Some(category_id);
        }
        if let Some(subcategory_id) = self.subcategory_id {
            listing.subcategory_id = Some(subcategory_id);
        }
        if let Some(user_id) = self.user_id {
            listing.user_id = Some(user_id);
        }
        if let Some(status) = self.status {
            listing.status = Some(status);
        }
        if let Some(views) = self.views {
            listing.views = views;
        }
        let mut extra = self.extra;
        strip_reserved(&mut extra, &RESERVED_LISTING_KEYS);
        listing.extra.extend(extra);
    }
}

/// Form input sends prices as numbers or numeric strings; anything else
/// reads as "no price".
pub(crate) fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.and_then(|v| Price(v).amount()))
}

// ===== USERS =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: UserRole,
    #[serde(default, serialize_with = "iso_millis::serialize", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: UserStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Defaults to [`UserRole::Seller`], also when empty.
    #[serde(default)]
    pub role: Option<UserRole>,
}

// ===== MESSAGES =====

/// A message between two users. Neither user id is validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub from_user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub to_user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(default, serialize_with = "iso_millis::serialize", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub read: bool,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    #[serde(default)]
    pub from_user_id: String,
    #[serde(default)]
    pub to_user_id: String,
    #[serde(default)]
    pub listing_id: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

// ===== AGGREGATE =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub site_name: String,
    pub currency: String,
    pub admin_email: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_name: "ZipZapZoi".to_string(),
            currency: "₹".to_string(),
            admin_email: "admin@zipzapzoi.com".to_string(),
        }
    }
}

pub const DATA_VERSION: &str = "1.0";

fn default_version() -> String {
    DATA_VERSION.to_string()
}

fn version_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_version))
}

/// A stored record that did not decode, with its position in the stored array.
pub type UnreadableRecord = (usize, JsonValue);

/// Records kept verbatim because they did not decode. They are invisible to
/// every query and written back where they were.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnreadableRecords {
    pub categories: Vec<UnreadableRecord>,
    pub listings: Vec<UnreadableRecord>,
    pub users: Vec<UnreadableRecord>,
    pub messages: Vec<UnreadableRecord>,
}

impl UnreadableRecords {
    pub fn len(&self) -> usize {
        self.categories.len() + self.listings.len() + self.users.len() + self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The single persisted unit. Written whole after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct AppData {
    pub categories: Vec<Category>,
    pub listings: Vec<Listing>,
    pub users: Vec<User>,
    pub messages: Vec<Message>,
    pub settings: Settings,
    /// Carried for future migrations; nothing branches on it yet.
    pub version: String,
    /// Top-level keys this crate does not know, written back untouched.
    pub extra: Map<String, JsonValue>,
    pub unreadable: UnreadableRecords,
}

impl Default for AppData {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            listings: Vec::new(),
            users: Vec::new(),
            messages: Vec::new(),
            settings: Settings::default(),
            version: default_version(),
            extra: Map::new(),
            unreadable: UnreadableRecords::default(),
        }
    }
}

#[derive(Deserialize)]
struct StoredAppData {
    #[serde(default, deserialize_with = "null_as_default")]
    categories: Vec<JsonValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    listings: Vec<JsonValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    users: Vec<JsonValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    messages: Vec<JsonValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    settings: Settings,
    #[serde(default = "default_version", deserialize_with = "version_or_default")]
    version: String,
    #[serde(flatten)]
    extra: Map<String, JsonValue>,
}

fn split_records<T: DeserializeOwned>(
    records: Vec<JsonValue>,
    unreadable: &mut Vec<UnreadableRecord>,
) -> Vec<T> {
    let mut typed = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match T::deserialize(&record) {
            Ok(item) => typed.push(item),
            Err(_) => unreadable.push((index, record)),
        }
    }
    typed
}

impl<'de> Deserialize<'de> for AppData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = StoredAppData::deserialize(deserializer)?;
        let mut unreadable = UnreadableRecords::default();

        Ok(AppData {
            categories: split_records(stored.categories, &mut unreadable.categories),
            listings: split_records(stored.listings, &mut unreadable.listings),
            users: split_records(stored.users, &mut unreadable.users),
            messages: split_records(stored.messages, &mut unreadable.messages),
            settings: stored.settings,
            version: stored.version,
            extra: stored.extra,
            unreadable,
        })
    }
}

/// One stored array: typed records with unreadable ones slotted back in at
/// their original positions.
struct MergedRecords<'a, T> {
    typed: &'a [T],
    unreadable: &'a [UnreadableRecord],
}

impl<T: Serialize> Serialize for MergedRecords<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.typed.len() + self.unreadable.len()))?;
        let mut pending = self.unreadable.iter().peekable();
        let mut written = 0;

        for item in self.typed {
            while let Some((_, raw)) = pending.next_if(|(index, _)| *index <= written) {
                seq.serialize_element(raw)?;
                written += 1;
            }
            seq.serialize_element(item)?;
            written += 1;
        }
        for (_, raw) in pending {
            seq.serialize_element(raw)?;
        }
        seq.end()
    }
}

#[derive(Serialize)]
struct StoredAppDataRef<'a> {
    categories: MergedRecords<'a, Category>,
    listings: MergedRecords<'a, Listing>,
    users: MergedRecords<'a, User>,
    messages: MergedRecords<'a, Message>,
    settings: &'a Settings,
    version: &'a str,
    #[serde(flatten)]
    extra: &'a Map<String, JsonValue>,
}

impl Serialize for AppData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StoredAppDataRef {
            categories: MergedRecords { typed: &self.categories, unreadable: &self.unreadable.categories },
            listings: MergedRecords { typed: &self.listings, unreadable: &self.unreadable.listings },
            users: MergedRecords { typed: &self.users, unreadable: &self.unreadable.users },
            messages: MergedRecords { typed: &self.messages, unreadable: &self.unreadable.messages },
            settings: &self.settings,
            version: &self.version,
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}

/// Counters for the admin dashboard. Unreadable records are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_categories: usize,
    pub total_listings: usize,
    pub active_listings: usize,
    pub total_users: usize,
    pub pending_listings: usize,
}

/// Lower-cases `name` and replaces each whitespace run with a single `-`.
///
/// Leading and trailing whitespace become a dash too; names are not trimmed.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
        } else {
            slug.push(c);
            in_space = false;
        }
    }
    slug
}

/// Treats an empty enum value like an absent one, the way form code sends
/// `""` for "not chosen".
pub(crate) fn non_empty<T: AsRef<str>>(value: Option<T>) -> Option<T> {
    value.filter(|v| !v.as_ref().is_empty())
}
