pub mod favorites;

pub use favorites::{reconcile, FavoritesStore, Reconcile};
