use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fusion_protocol::{Game, GameKey, StatusFilter};
use tracing::{debug, trace, warn};

use crate::error::CatalogError;
use crate::observer::{Subscribers, Subscription};
use crate::record::{GamePatch, GameRecord};
use crate::transition::can_transition;

/// Which resident records a [`CatalogStore::query`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub status: StatusFilter,
    /// Also return records flagged hidden (never counted in the aggregates).
    pub include_hidden: bool,
}

/// Records matching a filter, ordered by title, plus the live counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub records: Vec<GameRecord>,
    pub total: usize,
    pub installed: usize,
}

/// Immutable copy of the resident scope, emitted after every commit.
///
/// `records` includes hidden records (with their flag set); `total` and
/// `installed` do not count them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub records: Vec<GameRecord>,
    pub total: usize,
    pub installed: usize,
}

/// Result of merging a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    /// Records written (new or overwritten).
    pub applied: usize,
    /// Records discarded because the store already held a newer write.
    pub stale: usize,
    /// Whether the snapshot became the resident scope.
    pub scope_replaced: bool,
}

/// Result of an accepted-or-ignored patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    /// The store already holds a write at or after this generation.
    Stale,
    /// The record already has the requested value.
    Unchanged,
}

#[derive(Debug, Default)]
struct CatalogInner {
    records: HashMap<GameKey, GameRecord>,
    /// Keys returned by the most recent accepted snapshot.
    scope: HashSet<GameKey>,
    scope_generation: u64,
    /// Removal generation of confirmed hides.
    tombstones: HashMap<GameKey, u64>,
    total: usize,
    installed: usize,
    /// Number of commits so far; orders subscriber notifications.
    commits: u64,
}

impl CatalogInner {
    fn is_visible(&self, record: &GameRecord) -> bool {
        !record.hidden && self.scope.contains(&record.key)
    }

    fn recount(&mut self) {
        let (mut total, mut installed) = (0, 0);
        for record in self.records.values() {
            if self.is_visible(record) {
                total += 1;
                if record.is_installed() {
                    installed += 1;
                }
            }
        }
        self.total = total;
        self.installed = installed;
    }

    fn scoped_sorted(&self, filter: &RecordFilter) -> Vec<GameRecord> {
        let mut records: Vec<GameRecord> = self
            .scope
            .iter()
            .filter_map(|key| self.records.get(key))
            .filter(|r| filter.include_hidden || !r.hidden)
            .filter(|r| filter.status.matches(r.status))
            .cloned()
            .collect();
        sort_records(&mut records);
        records
    }

    /// Recounts and captures the snapshot of a new commit.
    fn commit(&mut self) -> (u64, Arc<CatalogSnapshot>) {
        self.recount();
        self.commits += 1;
        (self.commits, Arc::new(self.snapshot()))
    }

    fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            records: self.scoped_sorted(&RecordFilter {
                status: StatusFilter::All,
                include_hidden: true,
            }),
            total: self.total,
            installed: self.installed,
        }
    }
}

/// Orders records by case-insensitive title, then id, then storefront.
pub(crate) fn sort_records(records: &mut [GameRecord]) {
    records.sort_by_cached_key(|r| (r.title.to_lowercase(), r.key.id.clone(), r.key.source));
}

/// The authoritative local map of game records.
///
/// All methods take `&self`; writers serialize on an internal `RwLock` and
/// readers always see a consistent point-in-time copy. Subscribers are
/// notified after the lock has been released, in commit order.
#[derive(Debug, Default)]
pub struct CatalogStore {
    inner: RwLock<CatalogInner>,
    subscribers: Subscribers<Arc<CatalogSnapshot>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merges a `get_games` result fetched at `generation`.
    ///
    /// Each game overwrites the local copy only if `generation` is at least
    /// the local record's generation; older copies lost a race with an event
    /// and are dropped for that key. The snapshot's keys become the resident
    /// scope unless a newer snapshot already set it. Records outside the
    /// scope are kept, never evicted.
    pub fn apply_snapshot(&self, games: Vec<Game>, generation: u64) -> SnapshotOutcome {
        let mut outcome = SnapshotOutcome::default();

        let snapshot = {
            let mut inner = self.write();
            let mut keys = HashSet::with_capacity(games.len());

            for game in games {
                let key = game.key();

                if let Some(&removed_at) = inner.tombstones.get(&key) {
                    if generation < removed_at {
                        debug!(game = %key, generation, removed_at, "dropping hidden game from stale snapshot");
                        outcome.stale += 1;
                        continue;
                    }
                    inner.tombstones.remove(&key);
                }

                keys.insert(key.clone());
                let incoming = GameRecord::from_game(game, generation);
                let local_generation = inner.records.get(&key).map(|local| local.generation);
                match local_generation {
                    Some(local_generation) if generation < local_generation => {
                        debug!(
                            game = %key,
                            generation,
                            local_generation,
                            "discarding stale snapshot record"
                        );
                        outcome.stale += 1;
                    }
                    _ if inner.records.get(&key) == Some(&incoming) => {}
                    _ => {
                        inner.records.insert(key, incoming);
                        outcome.applied += 1;
                    }
                }
            }

            if generation >= inner.scope_generation {
                outcome.scope_replaced = inner.scope != keys;
                inner.scope = keys;
                inner.scope_generation = generation;
                // Older snapshots can no longer change the scope.
                inner.tombstones.retain(|_, removed_at| *removed_at > generation);
            } else {
                debug!(
                    generation,
                    scope_generation = inner.scope_generation,
                    "snapshot older than resident scope, keeping scope"
                );
            }

            if outcome.applied == 0 && !outcome.scope_replaced {
                None
            } else {
                Some(inner.commit())
            }
        };

        trace!(
            generation,
            applied = outcome.applied,
            stale = outcome.stale,
            scope_replaced = outcome.scope_replaced,
            "snapshot merged"
        );
        if let Some((seq, snapshot)) = snapshot {
            self.subscribers.notify(seq, &snapshot);
        }
        outcome
    }

    /// Applies a single-record change stamped with `generation`.
    ///
    /// Writes at or before the record's generation are duplicates or
    /// out-of-order deliveries and are ignored. A status change that is not
    /// an edge of the install lifecycle is rejected.
    pub fn apply_patch(
        &self,
        key: &GameKey,
        patch: GamePatch,
        generation: u64,
    ) -> Result<PatchOutcome, CatalogError> {
        let (seq, snapshot) = {
            let mut inner = self.write();
            let Some(record) = inner.records.get_mut(key) else {
                warn!(game = %key, ?patch, "patch for unknown game ignored");
                return Err(CatalogError::UnknownKey(key.clone()));
            };

            if generation <= record.generation {
                debug!(
                    game = %key,
                    ?patch,
                    generation,
                    local_generation = record.generation,
                    "ignoring stale patch"
                );
                return Ok(PatchOutcome::Stale);
            }

            match patch {
                GamePatch::Status(to) => {
                    if record.status == to {
                        return Ok(PatchOutcome::Unchanged);
                    }
                    if !can_transition(record.status, to) {
                        let err = CatalogError::InvalidTransition {
                            key: key.clone(),
                            from: record.status,
                            to,
                        };
                        warn!(error = %err, generation, "status transition rejected");
                        return Err(err);
                    }
                    record.status = to;
                }
                GamePatch::Hidden(hidden) => {
                    if record.hidden == hidden {
                        return Ok(PatchOutcome::Unchanged);
                    }
                    record.hidden = hidden;
                }
                GamePatch::Favorite(favorite) => {
                    if record.favorite == favorite {
                        return Ok(PatchOutcome::Unchanged);
                    }
                    record.favorite = favorite;
                }
            }
            record.generation = generation;

            inner.commit()
        };

        trace!(game = %key, ?patch, generation, "patch applied");
        self.subscribers.notify(seq, &snapshot);
        Ok(PatchOutcome::Applied)
    }

    /// Deletes a record after the backend confirmed it is hidden.
    ///
    /// The removal is remembered at `generation`, so a snapshot issued
    /// before the hide cannot bring the record back. Removing a game that
    /// was already removed (the `game-hidden` echo of a confirmed hide) is
    /// reported as `UnknownKey` but is not a warning.
    pub fn remove(&self, key: &GameKey, generation: u64) -> Result<GameRecord, CatalogError> {
        let (removed, seq, snapshot) = {
            let mut inner = self.write();
            let already_removed = inner.tombstones.contains_key(key);
            let removed_at = inner.tombstones.entry(key.clone()).or_insert(generation);
            *removed_at = (*removed_at).max(generation);

            let Some(removed) = inner.records.remove(key) else {
                if already_removed {
                    debug!(game = %key, generation, "game already removed");
                } else {
                    warn!(game = %key, generation, "remove for unknown game ignored");
                }
                return Err(CatalogError::UnknownKey(key.clone()));
            };
            inner.scope.remove(key);
            let (seq, snapshot) = inner.commit();
            (removed, seq, snapshot)
        };

        debug!(game = %key, generation, "game removed");
        self.subscribers.notify(seq, &snapshot);
        Ok(removed)
    }

    /// Records in the resident scope matching `filter`, ordered by title
    /// (case-insensitive), ties broken by id.
    pub fn query(&self, filter: &RecordFilter) -> QueryResult {
        let inner = self.read();
        QueryResult {
            records: inner.scoped_sorted(filter),
            total: inner.total,
            installed: inner.installed,
        }
    }

    /// Looks up one record, whether or not it is in the resident scope.
    pub fn get(&self, key: &GameKey) -> Option<GameRecord> {
        self.read().records.get(key).cloned()
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.read().snapshot()
    }

    /// `(total, installed)` over visible records.
    pub fn counts(&self) -> (usize, usize) {
        let inner = self.read();
        (inner.total, inner.installed)
    }

    /// Number of records held, in scope or not.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a callback receiving a fresh snapshot after every commit.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<CatalogSnapshot>) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }
}
