//! Restaurant query service arbitrating between the record store and the
//! network.
//!
//! Every query is built on the same fallback primitive: read the record
//! store first, go to the network only when the store has nothing, and
//! mirror a successful fetch back into the store. All operations complete
//! through `Result<T, DataError>`; a query either resolves with data or
//! fails once - there are no retries.

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::Restaurant;
use crate::store::RecordStore;

/// Sentinel filter value meaning "do not filter on this attribute".
pub const FILTER_ALL: &str = "all";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("network error: {0}")]
    Network(#[from] ApiError),

    #[error("restaurant {0} does not exist")]
    NotFound(i64),
}

/// Single source of truth for restaurant queries.
#[derive(Clone)]
pub struct DataService {
    api: ApiClient,
    store: Option<RecordStore>,
}

impl DataService {
    /// `store` is `None` when the host has no persistence capability; the
    /// service then runs network-only.
    pub fn new(api: ApiClient, store: Option<RecordStore>) -> Self {
        Self { api, store }
    }

    /// Fetch the listing from the API and mirror it into the record store.
    ///
    /// The write-back is fire-and-forget: callers get the parsed records
    /// without waiting for the store commit, so a read immediately after
    /// may still observe the previous snapshot.
    pub async fn fetch_from_network(&self) -> Result<Vec<Restaurant>, DataError> {
        let restaurants = self.api.fetch_restaurants().await?;

        if let Some(store) = self.store.clone() {
            let records = restaurants.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(e) = store.put_all(&records) {
                    warn!(error = %e, "failed to mirror fetched restaurants into the record store");
                }
            });
        }

        Ok(restaurants)
    }

    /// Whatever the record store currently holds. Empty when persistence is
    /// unavailable, nothing has been cached yet, or the snapshot cannot be
    /// read - callers cannot distinguish those cases.
    pub async fn fetch_cached(&self) -> Vec<Restaurant> {
        let Some(store) = self.store.clone() else {
            return Vec::new();
        };
        match tokio::task::spawn_blocking(move || store.get_all()).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                warn!(error = %e, "record store read failed, treating as empty");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "record store read task failed");
                Vec::new()
            }
        }
    }

    /// The fallback primitive every query builds on: cached data when the
    /// store is non-empty, otherwise a single network fetch.
    ///
    /// The cache read completes before the fallback decision; there is no
    /// speculative parallel fetch. An error surfaces only when the network
    /// fails with an empty cache.
    pub async fn fetch_all(&self) -> Result<Vec<Restaurant>, DataError> {
        let cached = self.fetch_cached().await;
        if !cached.is_empty() {
            debug!(count = cached.len(), "serving restaurants from the record store");
            return Ok(cached);
        }
        self.fetch_from_network().await
    }

    /// A single restaurant by id. `DataError::NotFound` when no record
    /// matches - distinct from a network failure.
    pub async fn by_id(&self, id: i64) -> Result<Restaurant, DataError> {
        let restaurants = self.fetch_all().await?;
        restaurants
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(DataError::NotFound(id))
    }

    /// Restaurants of the given cuisine, original relative order preserved.
    pub async fn by_cuisine(&self, cuisine: &str) -> Result<Vec<Restaurant>, DataError> {
        let restaurants = self.fetch_all().await?;
        Ok(restaurants
            .into_iter()
            .filter(|r| r.cuisine_type == cuisine)
            .collect())
    }

    /// Restaurants in the given neighborhood.
    pub async fn by_neighborhood(&self, neighborhood: &str) -> Result<Vec<Restaurant>, DataError> {
        let restaurants = self.fetch_all().await?;
        Ok(restaurants
            .into_iter()
            .filter(|r| r.neighborhood == neighborhood)
            .collect())
    }

    /// Restaurants whose boolean `favorites` flag equals `want`.
    pub async fn by_favorites(&self, want: bool) -> Result<Vec<Restaurant>, DataError> {
        let restaurants = self.fetch_all().await?;
        Ok(restaurants
            .into_iter()
            .filter(|r| r.favorites_eq(want))
            .collect())
    }

    /// Conjunctive cuisine/neighborhood/favorite filter for the listing
    /// page. [`FILTER_ALL`] skips an attribute; `favorite == false` skips
    /// the favorite predicate entirely.
    ///
    /// The favorite predicate reads the string `is_favorite` flag, not the
    /// boolean `favorites` one used by [`Self::by_favorites`]. The API
    /// serves both and they are kept deliberately separate.
    pub async fn filtered(
        &self,
        cuisine: &str,
        neighborhood: &str,
        favorite: bool,
    ) -> Result<Vec<Restaurant>, DataError> {
        let mut results = self.fetch_all().await?;
        if cuisine != FILTER_ALL {
            results.retain(|r| r.cuisine_type == cuisine);
        }
        if neighborhood != FILTER_ALL {
            results.retain(|r| r.neighborhood == neighborhood);
        }
        if favorite {
            results.retain(|r| r.marked_favorite());
        }
        Ok(results)
    }

    /// Every neighborhood present in the listing, de-duplicated in
    /// first-occurrence order.
    pub async fn distinct_neighborhoods(&self) -> Result<Vec<String>, DataError> {
        let restaurants = self.fetch_all().await?;
        Ok(distinct(restaurants.iter().map(|r| r.neighborhood.as_str())))
    }

    /// Every cuisine present in the listing, de-duplicated in
    /// first-occurrence order.
    pub async fn distinct_cuisines(&self) -> Result<Vec<String>, DataError> {
        let restaurants = self.fetch_all().await?;
        Ok(distinct(restaurants.iter().map(|r| r.cuisine_type.as_str())))
    }
}

/// De-duplicate, preserving first-occurrence order. The listing is small
/// enough that a linear scan beats hashing.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
