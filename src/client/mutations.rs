use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::{
    client::cache::SearchKey,
    models::{identity_key, SearchResponse},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Pending,
    Committed,
    RolledBack,
}

/// One favorite toggle and what is needed to undo it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Normalized identity of the toggled title
    pub key: String,
    /// Search page the optimistic projection was written to
    pub search_key: SearchKey,
    /// Entry data before the projection, `None` if nothing was cached.
    /// Only held while the mutation is pending.
    pub prior_value: Option<SearchResponse>,
    /// Favorite flag the toggle moves towards
    pub target: bool,
    pub status: MutationStatus,
    pub settled_at: Option<Instant>,
}

impl MutationRecord {
    pub fn pending(
        external_id: &str,
        search_key: SearchKey,
        prior_value: Option<SearchResponse>,
        target: bool,
    ) -> Self {
        Self {
            key: identity_key(external_id),
            search_key,
            prior_value,
            target,
            status: MutationStatus::Pending,
            settled_at: None,
        }
    }
}

/// Tracks the latest toggle per identity
///
/// A settled record stays in the table, without its snapshot, so its outcome
/// can be inspected until it is pruned or replaced by the next toggle of the
/// same title.
#[derive(Debug, Default)]
pub struct MutationTable {
    records: HashMap<String, MutationRecord>,
}

impl MutationTable {
    pub fn is_pending(&self, external_id: &str) -> bool {
        self.status(external_id) == Some(MutationStatus::Pending)
    }

    pub fn status(&self, external_id: &str) -> Option<MutationStatus> {
        self.records
            .get(&identity_key(external_id))
            .map(|record| record.status)
    }

    /// Registers a pending mutation; refuses if one is already in flight
    pub fn begin(&mut self, record: MutationRecord) -> bool {
        if self.is_pending(&record.key) {
            return false;
        }
        self.records.insert(record.key.clone(), record);
        true
    }

    /// Pending mutations projected onto the page `search_key`
    pub fn pending_for<'a>(
        &'a self,
        search_key: &'a SearchKey,
    ) -> impl Iterator<Item = &'a MutationRecord> + 'a {
        self.records.values().filter(move |record| {
            record.status == MutationStatus::Pending && &record.search_key == search_key
        })
    }

    /// Settles as committed and returns the record as it was while pending
    pub fn commit(&mut self, external_id: &str) -> Option<MutationRecord> {
        self.settle(external_id, MutationStatus::Committed)
    }

    /// Settles as rolled back and returns the record as it was while pending
    pub fn roll_back(&mut self, external_id: &str) -> Option<MutationRecord> {
        self.settle(external_id, MutationStatus::RolledBack)
    }

    fn settle(&mut self, external_id: &str, status: MutationStatus) -> Option<MutationRecord> {
        let record = self.records.get_mut(&identity_key(external_id))?;
        if record.status != MutationStatus::Pending {
            return None;
        }

        let pending = record.clone();
        record.status = status;
        record.prior_value = None;
        record.settled_at = Some(Instant::now());
        Some(pending)
    }

    /// Drops records settled at least `gc_after` ago
    pub fn prune(&mut self, gc_after: Duration) {
        self.records.retain(|_, record| {
            record
                .settled_at
                .map_or(true, |at| at.elapsed() < gc_after)
        });
    }
}
