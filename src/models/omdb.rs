use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use super::search::{ExternalTitle, SearchOutcome};

static YEAR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9]{4}\b").expect("static year pattern compiles")
});

/// Raw search payload from the OMDb API
///
/// `Response` is documented as a string ("True"/"False") but is decoded
/// loosely so a boolean works too.
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbSearchResponse {
    #[serde(rename = "Search", default)]
    pub search: Option<Vec<OmdbMovie>>,
    #[serde(rename = "totalResults", default)]
    pub total_results: Option<String>,
    #[serde(rename = "Response", default)]
    pub response: serde_json::Value,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OmdbMovie {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Year", default)]
    pub year: String,
    #[serde(rename = "Poster", default)]
    pub poster: String,
}

/// Extracts the first standalone four-digit year from strings like "1999",
/// "1999–2000" or "2010–". Returns 0 when there is none.
pub fn parse_year(raw: &str) -> u32 {
    YEAR_TOKEN
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// True for any encoding of OMDb's "no results" flag
fn is_negative_flag(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(flag) => !flag,
        serde_json::Value::String(flag) => flag.trim().eq_ignore_ascii_case("false"),
        _ => false,
    }
}

impl From<OmdbMovie> for ExternalTitle {
    fn from(movie: OmdbMovie) -> Self {
        ExternalTitle {
            year: parse_year(&movie.year),
            title: movie.title,
            external_id: movie.imdb_id,
            poster_url: movie.poster,
        }
    }
}

impl From<OmdbSearchResponse> for SearchOutcome {
    fn from(response: OmdbSearchResponse) -> Self {
        if is_negative_flag(&response.response) || response.error.is_some() {
            return SearchOutcome::Empty;
        }

        let items: Vec<ExternalTitle> = response
            .search
            .unwrap_or_default()
            .into_iter()
            .map(ExternalTitle::from)
            .collect();

        let total_results = response
            .total_results
            .as_deref()
            .and_then(|total| total.trim().parse().ok())
            .unwrap_or(0);

        if items.is_empty() && total_results == 0 {
            return SearchOutcome::Empty;
        }

        SearchOutcome::Found {
            items,
            total_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_single() {
        assert_eq!(parse_year("1999"), 1999);
    }

    #[test]
    fn test_parse_year_range_takes_first() {
        assert_eq!(parse_year("1999–2000"), 1999);
        assert_eq!(parse_year("1999-2000"), 1999);
        assert_eq!(parse_year("2010–"), 2010);
    }

    #[test]
    fn test_parse_year_missing() {
        assert_eq!(parse_year(""), 0);
        assert_eq!(parse_year("N/A"), 0);
        assert_eq!(parse_year("99"), 0);
    }

    #[test]
    fn test_parse_year_ignores_longer_digit_runs() {
        assert_eq!(parse_year("12345"), 0);
        assert_eq!(parse_year("12345 1999"), 1999);
    }

    #[test]
    fn test_false_string_sentinel_is_empty() {
        let json = r#"{"Response":"False","Error":"Movie not found!"}"#;
        let response: OmdbSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(SearchOutcome::from(response), SearchOutcome::Empty);
    }

    #[test]
    fn test_false_bool_sentinel_is_empty() {
        let json = r#"{"Response":false}"#;
        let response: OmdbSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(SearchOutcome::from(response), SearchOutcome::Empty);
    }

    #[test]
    fn test_found_response() {
        let json = r#"{
            "Search": [
                {"Title": "The Matrix", "Year": "1999", "imdbID": "tt0133093", "Type": "movie", "Poster": "http://img/1.jpg"},
                {"Title": "The Matrix Reloaded", "Year": "2003", "imdbID": "tt0234215", "Type": "movie", "Poster": "N/A"}
            ],
            "totalResults": "42",
            "Response": "True"
        }"#;
        let response: OmdbSearchResponse = serde_json::from_str(json).unwrap();

        match SearchOutcome::from(response) {
            SearchOutcome::Found {
                items,
                total_results,
            } => {
                assert_eq!(total_results, 42);
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].external_id, "tt0133093");
                assert_eq!(items[0].year, 1999);
                assert_eq!(items[1].poster_url, "N/A");
            }
            SearchOutcome::Empty => panic!("expected results"),
        }
    }

    #[test]
    fn test_found_without_total_defaults_to_zero() {
        let json = r#"{"Search":[{"Title":"Heat","Year":"1995","imdbID":"tt0113277"}],"Response":"True"}"#;
        let response: OmdbSearchResponse = serde_json::from_str(json).unwrap();
        let outcome = SearchOutcome::from(response);
        assert_eq!(outcome.items().len(), 1);
        assert_eq!(outcome.total_results(), "0");
    }
}
