use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Ack, Envelope, FavoriteItem, FavoritesListResponse},
    routes::{parse_page, AppState},
};

/// Body of `POST /movies/favorites`
///
/// Every field is optional at the serde level so missing or mistyped values
/// surface as `InvalidInput` with a useful message.
#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub title: Option<String>,
    #[serde(rename = "imdbID", alias = "externalId")]
    pub external_id: Option<String>,
    pub year: Option<i64>,
    #[serde(rename = "poster", alias = "posterUrl")]
    pub poster_url: Option<String>,
}

impl TryFrom<AddFavoriteRequest> for FavoriteItem {
    type Error = AppError;

    fn try_from(request: AddFavoriteRequest) -> AppResult<Self> {
        let year = match request.year {
            None => 0,
            Some(year) => u32::try_from(year).map_err(|_| {
                AppError::InvalidInput("Year must be a non-negative integer".to_string())
            })?,
        };

        FavoriteItem::new(
            request.title.unwrap_or_default().trim(),
            request.external_id.unwrap_or_default().trim(),
            year,
            request.poster_url.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
}

/// Handler for adding a favorite
pub async fn add(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<AddFavoriteRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Envelope<Ack>>)> {
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let item = FavoriteItem::try_from(request)?;

    tracing::info!(
        request_id = %request_id,
        external_id = %item.external_id,
        "Adding favorite"
    );

    let ack = state.store.add(item).await?;
    Ok((StatusCode::CREATED, Json(Envelope::new(ack))))
}

/// Handler for removing a favorite
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(imdb_id): Path<String>,
) -> AppResult<Json<Envelope<Ack>>> {
    tracing::info!(
        request_id = %request_id,
        external_id = %imdb_id,
        "Removing favorite"
    );

    let ack = state.store.remove(&imdb_id).await?;
    Ok(Json(Envelope::new(ack)))
}

/// Handler for listing favorites
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Envelope<FavoritesListResponse>>> {
    let page = parse_page(params.page.as_deref())?;
    let favorites = state.store.list(page, state.page_size).await?;
    Ok(Json(Envelope::new(favorites.into())))
}
