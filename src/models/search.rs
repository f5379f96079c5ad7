use serde::{Deserialize, Serialize};

/// Provider-agnostic search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTitle {
    pub title: String,
    pub external_id: String,
    /// First year of release, 0 when the provider gave none
    pub year: u32,
    pub poster_url: String,
}

/// Result of a provider search, with the provider's "nothing found" signal
/// already normalized away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found {
        items: Vec<ExternalTitle>,
        total_results: u64,
    },
    Empty,
}

impl SearchOutcome {
    pub fn items(&self) -> &[ExternalTitle] {
        match self {
            SearchOutcome::Found { items, .. } => items,
            SearchOutcome::Empty => &[],
        }
    }

    /// Total match count across all pages, string-encoded like the catalog does
    pub fn total_results(&self) -> String {
        match self {
            SearchOutcome::Found { total_results, .. } => total_results.to_string(),
            SearchOutcome::Empty => "0".to_string(),
        }
    }

    pub fn into_items(self) -> Vec<ExternalTitle> {
        match self {
            SearchOutcome::Found { items, .. } => items,
            SearchOutcome::Empty => Vec::new(),
        }
    }
}

/// Search hit annotated with favorite membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub title: String,
    #[serde(rename = "imdbID", alias = "externalId")]
    pub external_id: String,
    pub year: u32,
    #[serde(rename = "poster", alias = "posterUrl")]
    pub poster_url: String,
    pub is_favorite: bool,
}

/// Wire shape of a search response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub movies: Vec<SearchResultItem>,
    pub count: usize,
    pub total_results: String,
}

impl SearchResponse {
    pub fn new(movies: Vec<SearchResultItem>, total_results: String) -> Self {
        Self {
            count: movies.len(),
            movies,
            total_results,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), "0".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_outcome() {
        let outcome = SearchOutcome::Empty;
        assert!(outcome.items().is_empty());
        assert_eq!(outcome.total_results(), "0");
    }

    #[test]
    fn test_search_result_wire_format() {
        let item = SearchResultItem {
            title: "Alien".to_string(),
            external_id: "tt0078748".to_string(),
            year: 1979,
            poster_url: "N/A".to_string(),
            is_favorite: true,
        };

        let json = serde_json::to_value(SearchResponse::new(vec![item], "1".to_string())).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["totalResults"], "1");
        assert_eq!(json["movies"][0]["imdbID"], "tt0078748");
        assert_eq!(json["movies"][0]["isFavorite"], true);
        assert_eq!(json["movies"][0]["poster"], "N/A");
    }
}
