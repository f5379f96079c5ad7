use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{AppError, AppResult};

/// Canonical form of an external catalog identifier
///
/// Identities compare case-insensitively and ignore surrounding whitespace,
/// so "tt0133093" and " TT0133093" name the same title.
pub fn identity_key(external_id: &str) -> String {
    external_id.trim().to_lowercase()
}

/// True when two identifiers name the same catalog title
pub fn same_identity(a: &str, b: &str) -> bool {
    identity_key(a) == identity_key(b)
}

/// A title the user has marked as favorite
///
/// Field names on the wire and on disk follow the catalog's conventions
/// (`imdbID`, `poster`); the descriptive names are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub title: String,
    #[serde(rename = "imdbID", alias = "externalId")]
    pub external_id: String,
    /// Release year, 0 when unknown
    #[serde(default)]
    pub year: u32,
    #[serde(default, rename = "poster", alias = "posterUrl")]
    pub poster_url: String,
}

impl FavoriteItem {
    /// Builds a validated favorite
    pub fn new(
        title: impl Into<String>,
        external_id: impl Into<String>,
        year: u32,
        poster_url: impl Into<String>,
    ) -> AppResult<Self> {
        let item = Self {
            title: title.into(),
            external_id: external_id.into(),
            year,
            poster_url: poster_url.into(),
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title is required".to_string()));
        }
        if self.external_id.trim().is_empty() {
            return Err(AppError::InvalidInput("imdbID is required".to_string()));
        }
        Ok(())
    }

    pub fn identity(&self) -> String {
        identity_key(&self.external_id)
    }
}

/// Identity set of the favorites collection at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesSnapshot {
    identities: HashSet<String>,
}

impl FavoritesSnapshot {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a FavoriteItem>) -> Self {
        Self {
            identities: items.into_iter().map(FavoriteItem::identity).collect(),
        }
    }

    pub fn contains_identity(&self, external_id: &str) -> bool {
        self.identities.contains(&identity_key(external_id))
    }
}

/// One page of the favorites collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedFavorites {
    pub items: Vec<FavoriteItem>,
    pub total_count: usize,
    pub current_page: u32,
    pub total_pages: u32,
}

impl PaginatedFavorites {
    /// Slices `all` into the requested page
    ///
    /// `page` and `page_size` must already be validated as positive. Pages past
    /// the end yield no items but keep the requested page number.
    pub fn from_slice(all: &[FavoriteItem], page: u32, page_size: u32) -> Self {
        let total_count = all.len();
        let size = page_size as usize;
        let total_pages = total_count.div_ceil(size) as u32;

        let start = (page as usize - 1).saturating_mul(size);
        let items = all
            .iter()
            .skip(start)
            .take(size)
            .cloned()
            .collect();

        Self {
            items,
            total_count,
            current_page: page,
            total_pages,
        }
    }
}

/// Wire shape of a favorites page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesListResponse {
    pub favorites: Vec<FavoriteItem>,
    pub count: usize,
    pub total_results: String,
    pub current_page: u32,
    pub total_pages: u32,
}

impl From<PaginatedFavorites> for FavoritesListResponse {
    fn from(page: PaginatedFavorites) -> Self {
        Self {
            count: page.items.len(),
            favorites: page.items,
            total_results: page.total_count.to_string(),
            current_page: page.current_page,
            total_pages: page.total_pages,
        }
    }
}
