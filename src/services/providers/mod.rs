/// Movie catalog provider abstraction
///
/// Each provider turns a title query into a provider-agnostic
/// [`SearchOutcome`], hiding whatever encoding the upstream API uses for
/// "nothing found".
use crate::{
    error::{AppError, AppResult},
    models::SearchOutcome,
};

pub mod omdb;

pub use omdb::OmdbProvider;

/// Trait for catalog search providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for titles by name, one page at a time
    ///
    /// Fails with `InvalidInput` for a blank title or a zero page, and with
    /// `UpstreamUnavailable` when the provider cannot be reached or answers
    /// with something unreadable. An empty match set is not an error.
    async fn search(&self, title: &str, page: u32) -> AppResult<SearchOutcome>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Argument checks shared by every provider
pub fn validate_search(title: &str, page: u32) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }
    if page == 0 {
        return Err(AppError::InvalidInput(
            "Page must be a positive integer".to_string(),
        ));
    }
    Ok(())
}
