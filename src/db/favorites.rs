//! File-backed favorites collection.
//!
//! The JSON file is the source of truth and may be rewritten by other
//! processes at any time. Every operation therefore starts by comparing the
//! file's modification time against the version the in-memory snapshot was
//! loaded from, and reloads when the file is newer.
//!
//! Reconcile, mutate and persist run inside one async mutex so concurrent
//! requests in this process cannot interleave their writes. Writers in other
//! processes are only observed through reconciliation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    error::{AppError, AppResult},
    models::{identity_key, Ack, FavoriteItem, FavoritesSnapshot, PaginatedFavorites},
};

/// What to do with the in-memory snapshot given the local and backing versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Snapshot is current
    Keep,
    /// Backing file is newer; load it
    Reload,
    /// Backing file vanished after having been seen; start empty
    Reset,
}

/// Decides whether the snapshot must be refreshed
///
/// `None` as the backing version means the file does not exist.
pub fn reconcile(local: Option<SystemTime>, backing: Option<SystemTime>) -> Reconcile {
    match (local, backing) {
        (None, None) => Reconcile::Keep,
        (Some(_), None) => Reconcile::Reset,
        (None, Some(_)) => Reconcile::Reload,
        (Some(local), Some(backing)) if backing > local => Reconcile::Reload,
        (Some(_), Some(_)) => Reconcile::Keep,
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    items: Vec<FavoriteItem>,
    /// Modification time of the file the items were last synced with
    version: Option<SystemTime>,
}

/// Durable favorites collection
pub struct FavoritesStore {
    path: PathBuf,
    snapshot: Mutex<Snapshot>,
}

impl FavoritesStore {
    /// Creates a store over `path`
    ///
    /// Nothing is read or created until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns one page of favorites in insertion order
    pub async fn list(&self, page: u32, page_size: u32) -> AppResult<PaginatedFavorites> {
        if page == 0 {
            return Err(AppError::InvalidInput(
                "Page must be a positive integer".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(AppError::InvalidInput(
                "Page size must be a positive integer".to_string(),
            ));
        }

        let snapshot = self.reconciled().await?;
        Ok(PaginatedFavorites::from_slice(
            &snapshot.items,
            page,
            page_size,
        ))
    }

    /// Appends a favorite unless one with the same identity exists
    pub async fn add(&self, item: FavoriteItem) -> AppResult<Ack> {
        item.validate()?;

        let mut snapshot = self.reconciled().await?;
        let identity = item.identity();

        if snapshot
            .items
            .iter()
            .any(|existing| existing.identity() == identity)
        {
            return Err(AppError::Conflict(format!(
                "Movie {} already in favorites",
                item.external_id
            )));
        }

        let external_id = item.external_id.clone();
        snapshot.items.push(item);
        self.persist(&mut snapshot).await?;

        tracing::info!(
            external_id = %external_id,
            total = snapshot.items.len(),
            "Favorite added"
        );

        Ok(Ack::new("Movie added to favorites"))
    }

    /// Removes the favorite with the given identity
    pub async fn remove(&self, external_id: &str) -> AppResult<Ack> {
        if external_id.trim().is_empty() {
            return Err(AppError::InvalidInput("imdbID is required".to_string()));
        }

        let mut snapshot = self.reconciled().await?;
        let identity = identity_key(external_id);

        let position = snapshot
            .items
            .iter()
            .position(|existing| existing.identity() == identity)
            .ok_or_else(|| {
                AppError::NotFound(format!("Movie {} not found in favorites", external_id))
            })?;

        snapshot.items.remove(position);
        self.persist(&mut snapshot).await?;

        tracing::info!(
            external_id = %external_id,
            total = snapshot.items.len(),
            "Favorite removed"
        );

        Ok(Ack::new("Movie removed from favorites"))
    }

    /// Identity set of the current collection, reconciled once
    pub async fn snapshot(&self) -> AppResult<FavoritesSnapshot> {
        let snapshot = self.reconciled().await?;
        Ok(FavoritesSnapshot::from_items(&snapshot.items))
    }

    /// Locks the snapshot and brings it up to date with the backing file
    async fn reconciled(&self) -> AppResult<MutexGuard<'_, Snapshot>> {
        let mut snapshot = self.snapshot.lock().await;
        let backing = self.backing_version().await?;

        match reconcile(snapshot.version, backing) {
            Reconcile::Keep => {}
            Reconcile::Reload => {
                snapshot.items = self.read_items().await?;
                snapshot.version = backing;
                tracing::info!(
                    path = %self.path.display(),
                    count = snapshot.items.len(),
                    "Reloaded favorites from disk"
                );
            }
            Reconcile::Reset => {
                snapshot.items.clear();
                snapshot.version = None;
                tracing::warn!(
                    path = %self.path.display(),
                    "Favorites file disappeared, starting empty"
                );
            }
        }

        Ok(snapshot)
    }

    async fn backing_version(&self) -> AppResult<Option<SystemTime>> {
        match fs::metadata(&self.path).await {
            Ok(metadata) => metadata
                .modified()
                .map(Some)
                .map_err(|e| self.io_error("read modification time of", e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error("inspect", e)),
        }
    }

    async fn read_items(&self) -> AppResult<Vec<FavoriteItem>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error("read", e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Corrupt favorites file");
            AppError::Persistence(format!("Failed to parse favorites file: {}", e))
        })
    }

    /// Writes the snapshot and records the file's post-write modification time
    ///
    /// On failure the in-memory items keep the attempted state and the version
    /// is left untouched.
    async fn persist(&self, snapshot: &mut Snapshot) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error("create directory for", e))?;
            }
        }

        let json = serde_json::to_vec_pretty(&snapshot.items)
            .map_err(|e| AppError::Persistence(format!("Failed to encode favorites: {}", e)))?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, json)
            .await
            .map_err(|e| self.io_error("write", e))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|e| self.io_error("replace", e))?;

        snapshot.version = self.backing_version().await?;
        Ok(())
    }

    fn io_error(&self, action: &str, error: std::io::Error) -> AppError {
        tracing::error!(
            path = %self.path.display(),
            error = %error,
            "Favorites storage failure"
        );
        AppError::Persistence(format!(
            "Failed to {} favorites file {}: {}",
            action,
            self.path.display(),
            error
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn favorite(id: &str) -> FavoriteItem {
        FavoriteItem::new(format!("Movie {id}"), id, 2001, "").unwrap()
    }

    fn store_in(dir: &TempDir) -> FavoritesStore {
        FavoritesStore::new(dir.path().join("favorites.json"))
    }

    /// Rewrites the file as another process would, pushing its mtime forward
    fn overwrite_externally(path: &Path, items: &[FavoriteItem]) {
        std::fs::write(path, serde_json::to_vec(items).unwrap()).unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();
    }

    #[test]
    fn test_reconcile_decisions() {
        let earlier = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let later = earlier + Duration::from_secs(1);

        assert_eq!(reconcile(None, None), Reconcile::Keep);
        assert_eq!(reconcile(None, Some(earlier)), Reconcile::Reload);
        assert_eq!(reconcile(Some(earlier), Some(later)), Reconcile::Reload);
        assert_eq!(reconcile(Some(later), Some(later)), Reconcile::Keep);
        assert_eq!(reconcile(Some(later), Some(earlier)), Reconcile::Keep);
        assert_eq!(reconcile(Some(earlier), None), Reconcile::Reset);
    }

    #[tokio::test]
    async fn test_add_then_list_contains_item() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.add(favorite("tt0133093")).await.unwrap();

        let page = store.list(1, 10).await.unwrap();
        assert_eq!(page.items, vec![favorite("tt0133093")]);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_duplicate_add_conflicts_and_leaves_collection() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_ok!(store.add(favorite("tt1")).await);
        let error = assert_err!(store.add(favorite("TT1")).await);

        assert!(matches!(error, AppError::Conflict(_)));
        assert_eq!(store.list(1, 10).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add(favorite("tt1")).await.unwrap();

        let result = store.remove("tt9").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(store.list(1, 10).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_remove_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add(favorite("tt123")).await.unwrap();

        let ack = assert_ok!(store.remove("TT123").await);

        assert_eq!(ack.message, "Movie removed from favorites");
        assert_eq!(store.list(1, 10).await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(matches!(store.list(0, 10).await, Err(AppError::InvalidInput(_))));
        assert!(matches!(store.list(1, 0).await, Err(AppError::InvalidInput(_))));
        assert!(matches!(store.remove("  ").await, Err(AppError::InvalidInput(_))));

        let blank = FavoriteItem {
            title: String::new(),
            external_id: "tt1".to_string(),
            year: 0,
            poster_url: String::new(),
        };
        assert!(matches!(store.add(blank).await, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_pagination_over_fifteen_items() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for i in 0..15 {
            store.add(favorite(&format!("tt{i:03}"))).await.unwrap();
        }

        let first = store.list(1, 10).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_pages, 2);

        let second = store.list(2, 10).await.unwrap();
        assert_eq!(second.items.len(), 5);
        assert_eq!(second.items[0].external_id, "tt010");
    }

    #[tokio::test]
    async fn test_empty_store_lists_empty_page() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let page = store.list(3, 10).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.current_page, 3);
    }

    #[tokio::test]
    async fn test_read_never_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("data").join("nested");
        let store = FavoritesStore::new(nested.join("favorites.json"));

        store.list(1, 10).await.unwrap();
        store.snapshot().await.unwrap();
        assert!(!nested.exists());

        store.add(favorite("tt1")).await.unwrap();
        assert!(nested.join("favorites.json").exists());
    }

    #[tokio::test]
    async fn test_external_overwrite_is_observed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add(favorite("tt1")).await.unwrap();

        overwrite_externally(store.path(), &[favorite("tt7"), favorite("tt8")]);

        let page = store.list(1, 10).await.unwrap();
        let ids: Vec<&str> = page.items.iter().map(|i| i.external_id.as_str()).collect();
        assert_eq!(ids, vec!["tt7", "tt8"]);

        // Mutations see the reloaded set too
        assert!(matches!(store.add(favorite("TT8")).await, Err(AppError::Conflict(_))));
        store.remove("tt7").await.unwrap();
        assert!(matches!(store.remove("tt1").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_existing_file_is_loaded_on_first_use() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(
            &path,
            r#"[{"title":"Heat","imdbID":"tt0113277","year":1995,"poster":"N/A"}]"#,
        )
        .unwrap();

        let store = FavoritesStore::new(&path);
        let snapshot = store.snapshot().await.unwrap();
        assert!(snapshot.contains_identity("TT0113277"));
    }

    #[tokio::test]
    async fn test_deleted_file_resets_to_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.add(favorite("tt1")).await.unwrap();

        std::fs::remove_file(store.path()).unwrap();

        assert_eq!(store.list(1, 10).await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.list(1, 10).await, Err(AppError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_write_failure_keeps_in_memory_state() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        // A directory where the staging file should go makes the write fail
        let blocker = dir.path().join("favorites.json.tmp");
        std::fs::create_dir(&blocker).unwrap();

        let result = store.add(favorite("tt1")).await;
        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert!(!store.path().exists());

        // Once the path is usable again the attempted item is still in memory
        std::fs::remove_dir(&blocker).unwrap();
        let page = store.list(1, 10).await.unwrap();
        assert_eq!(page.items, vec![favorite("tt1")]);
        assert!(matches!(store.add(favorite("tt1")).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_concurrent_adds_all_persist() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.add(favorite(&format!("tt{i}"))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let fresh = store_in(&dir);
        assert_eq!(fresh.list(1, 50).await.unwrap().total_count, 20);
    }
}
