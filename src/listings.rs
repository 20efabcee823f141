//! Listing CRUD, text search and structured filtering.

use serde::Deserialize;

use crate::ids::{self, LISTING_PREFIX};
use crate::local_store::KeyValueStore;
use crate::manager::DataManager;
use crate::model::{
    self, lenient_price, non_empty, strip_reserved, Listing, ListingPatch, ListingStatus,
    NewListing, Price, RESERVED_LISTING_KEYS,
};

/// Independent predicates, ANDed. `None` skips a predicate.
///
/// A price bound of `0` is a real bound, not "unset". Empty id and status
/// strings are treated as unset, which is what the listing pages send for
/// "any". Listings without a numeric price never satisfy a price bound, and
/// neither do listings stored without a status when a status is asked for.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingFilter {
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    #[serde(deserialize_with = "lenient_price")]
    pub min_price: Option<f64>,
    #[serde(deserialize_with = "lenient_price")]
    pub max_price: Option<f64>,
    pub status: Option<ListingStatus>,
}

fn set(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(category_id) = set(&self.category_id) {
            if listing.category_id.as_deref() != Some(category_id) {
                return false;
            }
        }
        if let Some(subcategory_id) = set(&self.subcategory_id) {
            if listing.subcategory_id.as_deref() != Some(subcategory_id) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if !listing.price_amount().is_some_and(|p| p >= min) {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if !listing.price_amount().is_some_and(|p| p <= max) {
                return false;
            }
        }
        if let Some(status) = non_empty(self.status.as_ref()) {
            if listing.status.as_ref() != Some(status) {
                return false;
            }
        }
        true
    }
}

impl<S: KeyValueStore> DataManager<S> {
    pub fn list_listings(&self) -> Vec<Listing> {
        self.data.listings.clone()
    }

    pub fn get_listing(&self, listing_id: &str) -> Option<Listing> {
        self.data
            .listings
            .iter()
            .find(|l| l.id == listing_id)
            .cloned()
    }

    /// Exact match on the stored id; the category need not exist.
    pub fn listings_by_category(&self, category_id: &str) -> Vec<Listing> {
        self.collect_listings(|l| l.category_id.as_deref() == Some(category_id))
    }

    pub fn listings_by_user(&self, user_id: &str) -> Vec<Listing> {
        self.collect_listings(|l| l.user_id.as_deref() == Some(user_id))
    }

    pub fn create_listing(&mut self, new: NewListing) -> Listing {
        let mut extra = new.extra;
        strip_reserved(&mut extra, &RESERVED_LISTING_KEYS);

        let listing = Listing {
            id: ids::new_id(LISTING_PREFIX),
            title: new.title,
            description: new.description,
            price: new.price.map(Price::from),
            category_id: new.category_id,
            subcategory_id: new.subcategory_id,
            user_id: new.user_id,
            status: Some(non_empty(new.status).unwrap_or_default()),
            views: 0,
            created_at: Some(model::now()),
            updated_at: None,
            extra,
        };
        self.data.listings.push(listing.clone());
        self.commit();
        listing
    }

    /// Shallow-merges `patch` and stamps `updated_at`.
    pub fn update_listing(&mut self, listing_id: &str, patch: ListingPatch) -> Option<Listing> {
        let listing = self.data.listings.iter_mut().find(|l| l.id == listing_id)?;
        patch.apply_to(listing);
        listing.updated_at = Some(model::now());
        let updated = listing.clone();
        self.commit();
        Some(updated)
    }

    pub fn delete_listing(&mut self, listing_id: &str) -> bool {
        let before = self.data.listings.len();
        self.data.listings.retain(|l| l.id != listing_id);
        let removed = self.data.listings.len() != before;
        self.commit();
        removed
    }

    /// Case-insensitive substring search over title and description, in
    /// storage order. An empty query returns every listing.
    pub fn search_listings(&self, query: &str) -> Vec<Listing> {
        let needle = query.to_lowercase();
        self.collect_listings(|l| {
            l.title.to_lowercase().contains(&needle)
                || l.description.to_lowercase().contains(&needle)
        })
    }

    pub fn filter_listings(&self, filter: &ListingFilter) -> Vec<Listing> {
        self.collect_listings(|l| filter.matches(l))
    }

    fn collect_listings(&self, predicate: impl Fn(&Listing) -> bool) -> Vec<Listing> {
        self.data
            .listings
            .iter()
            .filter(|l| predicate(*l))
            .cloned()
            .collect()
    }
}
