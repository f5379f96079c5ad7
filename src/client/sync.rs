//! Client-side cache synchronizer.
//!
//! Holds search pages and favorites pages fetched from the movies API and
//! applies favorite toggles optimistically:
//!
//! 1. The toggled row is flipped in the cached search page right away and
//!    the previous page is recorded in the [`MutationTable`].
//! 2. The add/remove call goes out. While it is pending, another toggle of
//!    the same title is refused.
//! 3. On success the record is committed. On failure the row is restored
//!    from the recorded page. Either way the favorites and search regions are
//!    invalidated, since only the server knows the outcome for sure.
//!
//! A fetched search page never replaces a pending projection: before it is
//! stored, every pending toggle on that page is applied to it again. The
//! state lock is never held across a network call.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{
    client::{
        cache::{CacheEntry, QueryCache, QueryKey, Region, SearchKey},
        mutations::{MutationRecord, MutationStatus, MutationTable},
        transport::MoviesApi,
    },
    error::{AppError, AppResult},
    models::{
        identity_key, same_identity, FavoriteItem, FavoritesListResponse, SearchResponse,
        SearchResultItem,
    },
};

/// Errors surfaced to callers of the synchronizer
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] AppError),

    #[error("A favorite change for {0} is already in flight")]
    MutationInFlight(String),
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pause before the single retry of a failed fetch
    pub retry_backoff: Duration,
    /// Age after which a cached entry is refetched on observation
    pub stale_after: Duration,
    /// Unused entries and settled mutations older than this are dropped
    pub gc_after: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_millis(1000),
            stale_after: Duration::from_secs(60),
            gc_after: Duration::from_secs(300),
        }
    }
}

/// Result of a confirmed toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub external_id: String,
    pub is_favorite: bool,
    pub message: String,
}

#[derive(Debug, Default)]
struct SyncState {
    cache: QueryCache,
    mutations: MutationTable,
}

impl SyncState {
    fn collect_garbage(&mut self, gc_after: Duration) {
        let evicted = self.cache.collect_garbage(gc_after);
        self.mutations.prune(gc_after);
        if evicted > 0 {
            tracing::debug!(evicted = evicted, "Evicted unused cache entries");
        }
    }
}

pub struct CacheSynchronizer {
    api: Arc<dyn MoviesApi>,
    config: SyncConfig,
    state: Mutex<SyncState>,
}

impl CacheSynchronizer {
    pub fn new(api: Arc<dyn MoviesApi>, config: SyncConfig) -> Self {
        Self {
            api,
            config,
            state: Mutex::new(SyncState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the search page for `(query, page)`, from cache when fresh
    pub async fn fetch_search(&self, query: &str, page: u32) -> AppResult<SearchResponse> {
        let key = SearchKey::new(query, page);

        let generation = {
            let mut state = self.lock();
            state.collect_garbage(self.config.gc_after);
            let entry = state.cache.search_entry(&key);
            if let Some(data) = entry.fresh_data(self.config.stale_after) {
                let data = data.clone();
                entry.touch();
                return Ok(data);
            }
            entry.begin_fetch()
        };

        let api = self.api.as_ref();
        let search_query = key.query();
        let result = self
            .with_retry(move || api.search(search_query, page))
            .await;

        let mut guard = self.lock();
        let state = &mut *guard;
        let result = result.map(|mut fetched| {
            for record in state.mutations.pending_for(&key) {
                set_favorite(&mut fetched, &record.key, record.target);
            }
            fetched
        });

        if !state.cache.search_entry(&key).settle(generation, &result) {
            tracing::debug!(
                query = %key.query(),
                page = key.page(),
                "Discarded search response for an entry that changed meanwhile"
            );
        }
        result
    }

    /// Returns a favorites page, from cache when fresh
    pub async fn fetch_favorites(&self, page: u32) -> AppResult<FavoritesListResponse> {
        let generation = {
            let mut state = self.lock();
            state.collect_garbage(self.config.gc_after);
            let entry = state.cache.favorites_entry(page);
            if let Some(data) = entry.fresh_data(self.config.stale_after) {
                let data = data.clone();
                entry.touch();
                return Ok(data);
            }
            entry.begin_fetch()
        };

        let api = self.api.as_ref();
        let result = self.with_retry(move || api.favorites(page)).await;

        let mut state = self.lock();
        state.cache.favorites_entry(page).settle(generation, &result);
        result
    }

    /// Flips the favorite state of `item` as rendered on the page `key`
    ///
    /// The cached page reflects the new state immediately. The returned
    /// outcome carries the confirmed state; on error the page is back to what
    /// it showed before the toggle.
    pub async fn toggle_favorite(
        &self,
        key: &SearchKey,
        item: &SearchResultItem,
    ) -> Result<ToggleOutcome, SyncError> {
        let identity = identity_key(&item.external_id);

        let target = {
            let mut state = self.lock();
            if state.mutations.is_pending(&identity) {
                tracing::debug!(external_id = %item.external_id, "Toggle ignored, mutation in flight");
                return Err(SyncError::MutationInFlight(item.external_id.clone()));
            }

            let entry = state.cache.search.get_mut(key);
            let prior_value = entry.as_ref().and_then(|entry| entry.data.clone());
            let current = prior_value
                .as_ref()
                .and_then(|page| find_row(page, &identity))
                .map_or(item.is_favorite, |row| row.is_favorite);
            let target = !current;

            if let Some(entry) = entry {
                project(entry, &identity, target);
            }

            state.mutations.begin(MutationRecord::pending(
                &item.external_id,
                key.clone(),
                prior_value,
                target,
            ));
            target
        };

        let result = if target {
            let favorite = FavoriteItem {
                title: item.title.clone(),
                external_id: item.external_id.clone(),
                year: item.year,
                poster_url: item.poster_url.clone(),
            };
            self.api.add_favorite(&favorite).await
        } else {
            self.api.remove_favorite(&item.external_id).await
        };

        let mut guard = self.lock();
        let state = &mut *guard;

        let outcome = match result {
            Ok(ack) => {
                state.mutations.commit(&identity);
                tracing::info!(
                    external_id = %item.external_id,
                    is_favorite = target,
                    "Favorite toggle confirmed"
                );
                Ok(ToggleOutcome {
                    external_id: item.external_id.clone(),
                    is_favorite: target,
                    message: ack.message,
                })
            }
            Err(error) => {
                if let Some(record) = state.mutations.roll_back(&identity) {
                    restore(&mut state.cache, &record);
                }
                tracing::warn!(
                    external_id = %item.external_id,
                    error = %error,
                    "Favorite toggle failed, rolled back"
                );
                Err(SyncError::Api(error))
            }
        };

        state.cache.invalidate(Region::Favorites);
        state.cache.invalidate(Region::Search);
        outcome
    }

    /// Cached search page, if any
    pub fn cached_search(&self, key: &SearchKey) -> Option<CacheEntry<SearchResponse>> {
        self.lock().cache.search.get(key).cloned()
    }

    /// Cached favorites page, if any
    pub fn cached_favorites(&self, page: u32) -> Option<CacheEntry<FavoritesListResponse>> {
        self.lock().cache.favorites.get(&page).cloned()
    }

    /// Whether observing `key` now would trigger a network fetch
    pub fn needs_fetch(&self, key: &QueryKey) -> bool {
        self.lock().cache.needs_fetch(key, self.config.stale_after)
    }

    /// Whether `key` was explicitly invalidated since its last fetch
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.lock().cache.is_stale(key)
    }

    pub fn mutation_status(&self, external_id: &str) -> Option<MutationStatus> {
        self.lock().mutations.status(external_id)
    }

    /// Runs `call`, retrying once after the backoff if the error is retryable
    async fn with_retry<T, F, Fut>(&self, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match call().await {
            Err(error) if error.is_retryable() => {
                tracing::warn!(
                    error = %error,
                    backoff_ms = self.config.retry_backoff.as_millis() as u64,
                    "Fetch failed, retrying once"
                );
                tokio::time::sleep(self.config.retry_backoff).await;
                call().await
            }
            other => other,
        }
    }
}

fn find_row<'a>(page: &'a SearchResponse, identity: &str) -> Option<&'a SearchResultItem> {
    page.movies
        .iter()
        .find(|row| same_identity(&row.external_id, identity))
}

fn set_favorite(page: &mut SearchResponse, identity: &str, is_favorite: bool) {
    page.movies
        .iter_mut()
        .filter(|row| same_identity(&row.external_id, identity))
        .for_each(|row| row.is_favorite = is_favorite);
}

/// Writes the optimistic projection of a toggle into a cached page
fn project(entry: &mut CacheEntry<SearchResponse>, identity: &str, is_favorite: bool) {
    let projected = entry.data.clone().map(|mut page| {
        set_favorite(&mut page, identity, is_favorite);
        page
    });
    entry.overwrite(projected);
}

/// Puts the toggled rows back to their pre-toggle state
///
/// Only rows of the toggled title are touched so a concurrent toggle of a
/// different title on the same page keeps its projection. With no cached data
/// the recorded page is put back whole.
fn restore(cache: &mut QueryCache, record: &MutationRecord) {
    let Some(entry) = cache.search.get_mut(&record.search_key) else {
        return;
    };

    let restored = match entry.data.clone() {
        Some(mut page) => {
            set_favorite(&mut page, &record.key, !record.target);
            Some(page)
        }
        None => record.prior_value.clone(),
    };
    entry.overwrite(restored);
}
