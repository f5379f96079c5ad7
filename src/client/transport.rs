use reqwest::{Client as HttpClient, Response, Url};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    error::{AppError, AppResult},
    models::{Ack, Envelope, FavoriteItem, FavoritesListResponse, SearchResponse},
};

/// Network calls the synchronizer depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MoviesApi: Send + Sync {
    async fn search(&self, query: &str, page: u32) -> AppResult<SearchResponse>;

    async fn favorites(&self, page: u32) -> AppResult<FavoritesListResponse>;

    async fn add_favorite(&self, item: &FavoriteItem) -> AppResult<Ack>;

    async fn remove_favorite(&self, external_id: &str) -> AppResult<Ack>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`MoviesApi`] over HTTP against this crate's own server
#[derive(Clone)]
pub struct HttpMoviesApi {
    http_client: HttpClient,
    /// Base URL of the movie routes, e.g. `http://localhost:3001/movies`
    base_url: Url,
}

impl HttpMoviesApi {
    pub fn new(base_url: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::InvalidInput(format!("Invalid API base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::InvalidInput(format!(
                "Invalid API base URL: {}",
                base_url
            )));
        }

        Ok(Self {
            http_client: HttpClient::new(),
            base_url,
        })
    }

    /// Appends path segments, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| format!("Request failed with status {}", status));
            return Err(AppError::from_status(status, message));
        }

        response
            .json::<Envelope<T>>()
            .await
            .map(|envelope| envelope.data)
            .map_err(|e| AppError::UpstreamUnavailable(format!("Malformed API response: {}", e)))
    }
}

fn transport_error(error: reqwest::Error) -> AppError {
    tracing::warn!(error = %error, "Movies API request failed");
    AppError::UpstreamUnavailable(format!("Movies API unreachable: {}", error))
}

#[async_trait::async_trait]
impl MoviesApi for HttpMoviesApi {
    async fn search(&self, query: &str, page: u32) -> AppResult<SearchResponse> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Query is required and cannot be empty".to_string(),
            ));
        }
        if page == 0 {
            return Err(AppError::InvalidInput(
                "Page must be a positive integer".to_string(),
            ));
        }

        let response = self
            .http_client
            .get(self.endpoint(&["search"]))
            .query(&[("q", query.trim()), ("page", page.to_string().as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        Self::decode(response).await
    }

    async fn favorites(&self, page: u32) -> AppResult<FavoritesListResponse> {
        if page == 0 {
            return Err(AppError::InvalidInput(
                "Page must be a positive integer".to_string(),
            ));
        }

        let response = self
            .http_client
            .get(self.endpoint(&["favorites", "list"]))
            .query(&[("page", page)])
            .send()
            .await
            .map_err(transport_error)?;

        Self::decode(response).await
    }

    async fn add_favorite(&self, item: &FavoriteItem) -> AppResult<Ack> {
        item.validate()?;

        let response = self
            .http_client
            .post(self.endpoint(&["favorites"]))
            .json(item)
            .send()
            .await
            .map_err(transport_error)?;

        Self::decode(response).await
    }

    async fn remove_favorite(&self, external_id: &str) -> AppResult<Ack> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(AppError::InvalidInput(
                "imdbID is required and cannot be empty".to_string(),
            ));
        }

        let response = self
            .http_client
            .delete(self.endpoint(&["favorites", external_id]))
            .send()
            .await
            .map_err(transport_error)?;

        Self::decode(response).await
    }
}
