use serde::{Deserialize, Serialize};

pub mod favorite;
pub mod omdb;
pub mod search;

pub use favorite::{
    identity_key, same_identity, FavoriteItem, FavoritesListResponse, FavoritesSnapshot,
    PaginatedFavorites,
};
pub use omdb::{OmdbMovie, OmdbSearchResponse};
pub use search::{ExternalTitle, SearchOutcome, SearchResponse, SearchResultItem};

/// Response envelope shared by every successful API response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Acknowledgement returned by favorite mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
