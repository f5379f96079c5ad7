use crate::{
    db::FavoritesStore,
    error::AppResult,
    models::{ExternalTitle, FavoritesSnapshot, SearchResponse, SearchResultItem},
    services::providers::SearchProvider,
};

/// Marks each search hit that is already a favorite
///
/// Pure over its inputs: the caller takes one favorites snapshot per request.
pub fn annotate(raw: Vec<ExternalTitle>, favorites: &FavoritesSnapshot) -> Vec<SearchResultItem> {
    raw.into_iter()
        .map(|title| SearchResultItem {
            is_favorite: favorites.contains_identity(&title.external_id),
            title: title.title,
            external_id: title.external_id,
            year: title.year,
            poster_url: title.poster_url,
        })
        .collect()
}

/// Service function for annotated title search
///
/// Queries the provider first, then reconciles the favorites store once so
/// membership reflects the collection at response time.
pub async fn search_movies(
    provider: &dyn SearchProvider,
    store: &FavoritesStore,
    query: &str,
    page: u32,
) -> AppResult<SearchResponse> {
    let outcome = provider.search(query, page).await?;
    let total_results = outcome.total_results();

    let favorites = store.snapshot().await?;
    let movies = annotate(outcome.into_items(), &favorites);

    tracing::debug!(
        query = %query,
        page = page,
        provider = provider.name(),
        favorites = movies.iter().filter(|m| m.is_favorite).count(),
        "Annotated search results"
    );

    Ok(SearchResponse::new(movies, total_results))
}
