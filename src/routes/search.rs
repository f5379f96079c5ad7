use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Envelope, SearchResponse},
    routes::{parse_page, AppState},
    services::search_movies,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    page: Option<String>,
}

/// Handler for title search endpoint
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Envelope<SearchResponse>>> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Query parameter q is required".to_string()))?;
    let page = parse_page(params.page.as_deref())?;

    tracing::info!(
        request_id = %request_id,
        query = %query,
        page = page,
        "Processing search request"
    );

    let response = search_movies(state.provider.as_ref(), &state.store, query, page).await?;

    Ok(Json(Envelope::new(response)))
}
