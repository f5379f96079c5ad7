use axum::{
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    db::FavoritesStore,
    error::{AppError, AppResult},
    middleware::{propagate_request_id, request_span},
    services::SearchProvider,
};

pub mod favorites;
pub mod search;

/// Shared state handed to every handler
pub struct AppState {
    pub store: Arc<FavoritesStore>,
    pub provider: Arc<dyn SearchProvider>,
    /// Page size for favorites listings
    pub page_size: u32,
}

impl AppState {
    pub fn new(
        store: Arc<FavoritesStore>,
        provider: Arc<dyn SearchProvider>,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            provider,
            page_size,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/movies", movie_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(propagate_request_id))
                .layer(TraceLayer::new_for_http().make_span_with(request_span)),
        )
}

/// Routes under /movies
fn movie_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", get(search::search))
        .route("/favorites", post(favorites::add))
        .route("/favorites/list", get(favorites::list))
        .route("/favorites/:imdb_id", delete(favorites::remove))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "timestamp": Utc::now() })),
    )
}

/// Parses an optional `page` query value, defaulting to 1
pub(crate) fn parse_page(raw: Option<&str>) -> AppResult<u32> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(1),
        Some(raw) => raw,
    };

    match raw.parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(AppError::InvalidInput(
            "Page must be a positive integer".to_string(),
        )),
    }
}
