/// OMDb API provider
///
/// Search only: `GET {api_url}?apikey=..&s=<title>&page=<n>`. OMDb answers
/// HTTP 200 even when nothing matched and signals that through
/// `"Response": "False"` plus an `Error` message, which is folded into
/// [`SearchOutcome::Empty`] here.
use crate::{
    error::{AppError, AppResult},
    models::{OmdbSearchResponse, SearchOutcome},
    services::providers::{validate_search, SearchProvider},
};
use reqwest::Client as HttpClient;

#[derive(Clone)]
pub struct OmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl OmdbProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self::with_client(HttpClient::new(), api_key, api_url)
    }

    pub fn with_client(http_client: HttpClient, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
        }
    }

    fn upstream_error(&self, context: &str, detail: impl std::fmt::Display) -> AppError {
        tracing::error!(provider = "omdb", error = %detail, "{}", context);
        AppError::UpstreamUnavailable(format!("{}: {}", context, detail))
    }
}

#[async_trait::async_trait]
impl SearchProvider for OmdbProvider {
    async fn search(&self, title: &str, page: u32) -> AppResult<SearchOutcome> {
        validate_search(title, page)?;

        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("s", title.trim()),
                ("page", page.to_string().as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.upstream_error("Failed to reach OMDb API", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.upstream_error(
                "OMDb API returned an error status",
                format!("{}: {}", status, body),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.upstream_error("Failed to read OMDb response", e))?;

        let payload: OmdbSearchResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(response = %body, "Raw OMDb response");
            self.upstream_error("Failed to parse OMDb response", e)
        })?;

        let outcome = SearchOutcome::from(payload);

        tracing::info!(
            query = %title,
            page = page,
            results = outcome.items().len(),
            total = %outcome.total_results(),
            provider = "omdb",
            "Title search completed"
        );

        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    /// Serves `router` on an ephemeral port and returns its base URL
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn provider(api_url: String) -> OmdbProvider {
        OmdbProvider::new("test_key".to_string(), api_url)
    }

    #[tokio::test]
    async fn test_search_found() {
        let router = Router::new().route(
            "/",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("apikey").map(String::as_str), Some("test_key"));
                assert_eq!(params.get("s").map(String::as_str), Some("the matrix"));
                assert_eq!(params.get("page").map(String::as_str), Some("2"));
                Json(json!({
                    "Search": [
                        {"Title": "The Matrix", "Year": "1999", "imdbID": "tt0133093", "Type": "movie", "Poster": "N/A"}
                    ],
                    "totalResults": "11",
                    "Response": "True"
                }))
            }),
        );
        let provider = provider(serve(router).await);

        let outcome = provider.search(" the matrix ", 2).await.unwrap();

        assert_eq!(outcome.total_results(), "11");
        assert_eq!(outcome.items()[0].external_id, "tt0133093");
        assert_eq!(outcome.items()[0].year, 1999);
    }

    #[tokio::test]
    async fn test_search_not_found_is_empty() {
        let router = Router::new().route(
            "/",
            get(|| async { Json(json!({"Response": "False", "Error": "Movie not found!"})) }),
        );
        let provider = provider(serve(router).await);

        let outcome = provider.search("zzzzqqq", 1).await.unwrap();
        assert_eq!(outcome, SearchOutcome::Empty);
    }

    #[tokio::test]
    async fn test_search_error_status_is_upstream_unavailable() {
        let router = Router::new().route(
            "/",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let provider = provider(serve(router).await);

        let result = provider.search("matrix", 1).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_search_malformed_payload_is_upstream_unavailable() {
        let router = Router::new().route("/", get(|| async { "<html>oops</html>" }));
        let provider = provider(serve(router).await);

        let result = provider.search("matrix", 1).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_search_unreachable_is_upstream_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = provider(format!("http://{}/", addr));
        let result = provider.search("matrix", 1).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_search_validates_before_calling() {
        let provider = provider("http://test.local".to_string());

        assert!(matches!(
            provider.search("  ", 1).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            provider.search("matrix", 0).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
