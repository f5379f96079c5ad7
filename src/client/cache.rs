//! Query cache for the client synchronizer.
//!
//! Entries are keyed by their exact fetch coordinates. Every write that did
//! not come from the entry's own fetch (optimistic projection, rollback,
//! invalidation) bumps the entry's generation, and a fetch only stores its
//! result when the generation it started with is still current.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::{
    error::AppError,
    models::{FavoritesListResponse, SearchResponse},
};

/// Coordinates of a cached search page
///
/// The query is stored trimmed, so `"alien "` and `"alien"` share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    query: String,
    page: u32,
}

impl SearchKey {
    pub fn new(query: &str, page: u32) -> Self {
        Self {
            query: query.trim().to_string(),
            page,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

/// Any cached query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Search(SearchKey),
    Favorites { page: u32 },
}

/// Group of cached queries invalidated together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Search,
    Favorites,
}

/// Lifecycle of one cached query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Fetching,
    Succeeded,
    Failed(AppError),
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub status: FetchStatus,
    /// Last successfully fetched value, kept across failed refetches
    pub data: Option<T>,
    stale: bool,
    fetched_at: Option<Instant>,
    /// Last read or write, for garbage collection
    last_used: Instant,
    generation: u64,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            status: FetchStatus::Idle,
            data: None,
            stale: false,
            fetched_at: None,
            last_used: Instant::now(),
            generation: 0,
        }
    }
}

impl<T: Clone> CacheEntry<T> {
    /// Data that can be served without a network round trip
    pub fn fresh_data(&self, stale_after: Duration) -> Option<&T> {
        if self.needs_fetch(stale_after) {
            return None;
        }
        self.data.as_ref()
    }

    pub fn needs_fetch(&self, stale_after: Duration) -> bool {
        if self.stale || self.data.is_none() {
            return true;
        }
        if matches!(self.status, FetchStatus::Failed(_)) {
            return true;
        }
        match self.fetched_at {
            Some(at) => at.elapsed() >= stale_after,
            None => true,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub(crate) fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Whether the entry went unused for `gc_after` and no fetch is running
    fn is_collectable(&self, gc_after: Duration) -> bool {
        self.status != FetchStatus::Fetching && self.last_used.elapsed() >= gc_after
    }

    /// Marks the entry as fetching and returns the generation token to settle with
    pub(crate) fn begin_fetch(&mut self) -> u64 {
        self.status = FetchStatus::Fetching;
        self.touch();
        self.generation
    }

    /// Stores a fetch result if nothing else wrote the entry meanwhile
    ///
    /// Returns false when the result was discarded.
    pub(crate) fn settle(&mut self, generation: u64, result: &Result<T, AppError>) -> bool {
        self.touch();
        if generation != self.generation {
            // The entry moved on; keep it stale so the next observer refetches
            self.stale = true;
            if self.status == FetchStatus::Fetching {
                self.status = FetchStatus::Idle;
            }
            return false;
        }

        match result {
            Ok(data) => {
                self.data = Some(data.clone());
                self.status = FetchStatus::Succeeded;
                self.stale = false;
                self.fetched_at = Some(Instant::now());
            }
            Err(error) => {
                self.status = FetchStatus::Failed(error.clone());
            }
        }
        true
    }

    /// Replaces the data outside the fetch path
    pub(crate) fn overwrite(&mut self, data: Option<T>) {
        self.data = data;
        self.touch();
        self.generation += 1;
    }

    pub(crate) fn invalidate(&mut self) {
        self.stale = true;
        self.generation += 1;
    }
}

/// All cached queries of one client
#[derive(Debug, Default)]
pub struct QueryCache {
    pub(crate) search: HashMap<SearchKey, CacheEntry<SearchResponse>>,
    pub(crate) favorites: HashMap<u32, CacheEntry<FavoritesListResponse>>,
}

impl QueryCache {
    pub(crate) fn search_entry(&mut self, key: &SearchKey) -> &mut CacheEntry<SearchResponse> {
        self.search.entry(key.clone()).or_default()
    }

    pub(crate) fn favorites_entry(&mut self, page: u32) -> &mut CacheEntry<FavoritesListResponse> {
        self.favorites.entry(page).or_default()
    }

    /// Marks every entry of `region` for refetch, leaving other regions alone
    pub(crate) fn invalidate(&mut self, region: Region) {
        match region {
            Region::Search => self.search.values_mut().for_each(CacheEntry::invalidate),
            Region::Favorites => self.favorites.values_mut().for_each(CacheEntry::invalidate),
        }
    }

    /// Drops every entry unused for at least `gc_after`
    ///
    /// Entries with a fetch in flight are kept. Returns the number removed.
    pub(crate) fn collect_garbage(&mut self, gc_after: Duration) -> usize {
        let before = self.search.len() + self.favorites.len();
        self.search.retain(|_, entry| !entry.is_collectable(gc_after));
        self.favorites.retain(|_, entry| !entry.is_collectable(gc_after));
        before - self.search.len() - self.favorites.len()
    }

    /// Whether observing `key` now would go to the network
    pub fn needs_fetch(&self, key: &QueryKey, stale_after: Duration) -> bool {
        match key {
            QueryKey::Search(key) => self
                .search
                .get(key)
                .map_or(true, |entry| entry.needs_fetch(stale_after)),
            QueryKey::Favorites { page } => self
                .favorites
                .get(page)
                .map_or(true, |entry| entry.needs_fetch(stale_after)),
        }
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        match key {
            QueryKey::Search(key) => self.search.get(key).is_some_and(CacheEntry::is_stale),
            QueryKey::Favorites { page } => {
                self.favorites.get(page).is_some_and(CacheEntry::is_stale)
            }
        }
    }
}
