//! Client side of the movies API: a query cache kept in sync with the server
//! through optimistic favorite toggles.

pub mod cache;
pub mod mutations;
pub mod sync;
pub mod transport;

pub use cache::{CacheEntry, FetchStatus, QueryCache, QueryKey, Region, SearchKey};
pub use mutations::{MutationRecord, MutationStatus, MutationTable};
pub use sync::{CacheSynchronizer, SyncConfig, SyncError, ToggleOutcome};
pub use transport::{HttpMoviesApi, MoviesApi};
