pub mod providers;
pub mod search;

pub use providers::{OmdbProvider, SearchProvider};
pub use search::{annotate, search_movies};
