use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use fusion_catalog::{Subscribers, Subscription};
use fusion_protocol::GameKey;
use tracing::{debug, trace};

use crate::types::{CompletedDownloadEntry, DownloadOrigin, DownloadQueueEntry, DownloadsSnapshot};

#[derive(Debug, Default)]
struct TrackerInner {
    /// Active downloads in arrival order.
    queue: Vec<DownloadQueueEntry>,
    /// Finished downloads, oldest first. A reinstalled game appears once
    /// per completion.
    completed: Vec<CompletedDownloadEntry>,
    commits: u64,
}

impl TrackerInner {
    fn position(&self, key: &GameKey) -> Option<usize> {
        self.queue.iter().position(|e| &e.key == key)
    }

    fn snapshot(&self) -> DownloadsSnapshot {
        DownloadsSnapshot {
            queue: self.queue.clone(),
            completed: self.completed.clone(),
        }
    }
}

/// Tracks active downloads and keeps a history of finished ones.
///
/// Every operation is idempotent with respect to duplicate events: a second
/// enqueue, a non-increasing progress report or a repeated completion
/// changes nothing and notifies no one.
#[derive(Debug, Default)]
pub struct DownloadTracker {
    inner: RwLock<TrackerInner>,
    subscribers: Subscribers<Arc<DownloadsSnapshot>>,
}

impl DownloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, TrackerInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackerInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `mutate` under the write lock and, if it reports a change,
    /// notifies subscribers in commit order once the lock is released.
    fn commit<R>(&self, mutate: impl FnOnce(&mut TrackerInner) -> Option<R>) -> Option<R> {
        let (result, seq, snapshot) = {
            let mut inner = self.write();
            let result = mutate(&mut *inner)?;
            inner.commits += 1;
            (result, inner.commits, Arc::new(inner.snapshot()))
        };
        self.subscribers.notify(seq, &snapshot);
        Some(result)
    }

    /// Appends `entry` to the active queue. Returns `false` if a download
    /// for the same game is already active.
    pub fn enqueue(&self, entry: DownloadQueueEntry) -> bool {
        let key = entry.key.clone();
        let origin = entry.origin;
        let added = self
            .commit(|inner| {
                if inner.position(&entry.key).is_some() {
                    return None;
                }
                inner.queue.push(entry);
                Some(())
            })
            .is_some();

        if added {
            debug!(game = %key, ?origin, "download enqueued");
        } else {
            trace!(game = %key, "download already queued");
        }
        added
    }

    /// Raises the downloaded byte count. Lower or equal values are ignored.
    pub fn update_progress(&self, key: &GameKey, downloaded_bytes: u64) -> bool {
        self.commit(|inner| {
            let Some(idx) = inner.position(key) else {
                debug!(game = %key, downloaded_bytes, "progress for game not in queue");
                return None;
            };
            let entry = &mut inner.queue[idx];
            if downloaded_bytes <= entry.downloaded_bytes {
                trace!(
                    game = %key,
                    downloaded_bytes,
                    current = entry.downloaded_bytes,
                    "ignoring non-increasing progress"
                );
                return None;
            }
            entry.downloaded_bytes = downloaded_bytes;
            Some(())
        })
        .is_some()
    }

    /// Fills the progress bar once the payload is on disk and installation
    /// has begun. No effect when the total is unknown.
    pub fn mark_fully_downloaded(&self, key: &GameKey) -> bool {
        self.commit(|inner| {
            let idx = inner.position(key)?;
            let entry = &mut inner.queue[idx];
            if entry.total_bytes == 0 || entry.downloaded_bytes >= entry.total_bytes {
                return None;
            }
            entry.downloaded_bytes = entry.total_bytes;
            Some(())
        })
        .is_some()
    }

    /// Moves a download from the queue to the completed list.
    ///
    /// An unknown total adopts the downloaded byte count. Earlier
    /// completions of the same game are kept.
    pub fn complete(&self, key: &GameKey) -> Option<CompletedDownloadEntry> {
        let completed = self.commit(|inner| {
            let idx = inner.position(key)?;
            let mut download = inner.queue.remove(idx);
            if download.total_bytes == 0 {
                download.total_bytes = download.downloaded_bytes;
            }
            download.downloaded_bytes = download.total_bytes;

            let entry = CompletedDownloadEntry {
                download,
                completed_at: Utc::now(),
            };
            inner.completed.push(entry.clone());
            Some(entry)
        });

        match &completed {
            Some(entry) => debug!(
                game = %key,
                total_bytes = entry.download.total_bytes,
                "download completed"
            ),
            None => trace!(game = %key, "completion for game not in queue"),
        }
        completed
    }

    /// Removes the most recent completed entry for `key`.
    pub fn remove_completed(&self, key: &GameKey) -> bool {
        self.commit(|inner| {
            let idx = inner.completed.iter().rposition(|c| c.key() == key)?;
            inner.completed.remove(idx);
            Some(())
        })
        .is_some()
    }

    /// Empties the completed list, returning how many entries were dropped.
    pub fn clear_completed(&self) -> usize {
        self.commit(|inner| {
            let cleared = inner.completed.len();
            inner.completed.clear();
            (cleared > 0).then_some(cleared)
        })
        .unwrap_or(0)
    }

    /// All active downloads, in arrival order.
    pub fn queue(&self) -> Vec<DownloadQueueEntry> {
        self.read().queue.clone()
    }

    /// Active downloads started from this library.
    pub fn up_next(&self) -> Vec<DownloadQueueEntry> {
        self.filtered(DownloadOrigin::Managed)
    }

    /// Active downloads driven by a storefront client.
    pub fn external(&self) -> Vec<DownloadQueueEntry> {
        self.filtered(DownloadOrigin::External)
    }

    fn filtered(&self, origin: DownloadOrigin) -> Vec<DownloadQueueEntry> {
        self.read()
            .queue
            .iter()
            .filter(|e| e.origin == origin)
            .cloned()
            .collect()
    }

    pub fn completed(&self) -> Vec<CompletedDownloadEntry> {
        self.read().completed.clone()
    }

    /// The active download for `key`, if any.
    pub fn get(&self, key: &GameKey) -> Option<DownloadQueueEntry> {
        let inner = self.read();
        inner.position(key).map(|idx| inner.queue[idx].clone())
    }

    pub fn snapshot(&self) -> DownloadsSnapshot {
        self.read().snapshot()
    }

    /// Registers a callback receiving a fresh snapshot after every change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<DownloadsSnapshot>) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }
}
