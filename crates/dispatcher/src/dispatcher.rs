use std::sync::Arc;

use futures_util::{Stream, StreamExt, stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use fusion_catalog::{CatalogError, CatalogStore, GamePatch, GenerationClock};
use fusion_downloads::{DownloadQueueEntry, DownloadTracker};
use fusion_protocol::{EventMessage, GameEvent, GameKey, GameStatus};

use crate::config::DispatcherConfig;

/// Routes push events into the catalog and the download tracker.
///
/// Handlers are synchronous and never wait on the backend, so a slow
/// command can not stall event processing.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    catalog: Arc<CatalogStore>,
    downloads: Arc<DownloadTracker>,
    clock: GenerationClock,
}

impl EventDispatcher {
    pub fn new(
        catalog: Arc<CatalogStore>,
        downloads: Arc<DownloadTracker>,
        clock: GenerationClock,
    ) -> Self {
        Self {
            catalog,
            downloads,
            clock,
        }
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn downloads(&self) -> &Arc<DownloadTracker> {
        &self.downloads
    }

    pub fn clock(&self) -> &GenerationClock {
        &self.clock
    }

    /// Decodes and routes one envelope.
    ///
    /// Returns the generation the event was stamped with, or `None` if the
    /// envelope was dropped.
    pub fn handle_message(&self, msg: &EventMessage) -> Option<u64> {
        match msg.decode() {
            Ok(event) => Some(self.handle(event)),
            Err(e) => {
                warn!(event = msg.event.as_str(), error = %e, "dropping push event");
                None
            }
        }
    }

    /// Stamps `event` with the next generation and applies it.
    pub fn handle(&self, event: GameEvent) -> u64 {
        let generation = self.clock.advance();
        let key = event.key();
        let event_type = event.event_type();
        trace!(
            game = %key,
            event = event_type.as_str(),
            generation,
            "routing push event"
        );

        match event {
            GameEvent::Hidden(_) => {
                // The store logs an unknown key; the download queue is left
                // alone so an in-flight download stays visible.
                let _ = self.catalog.remove(&key, generation);
            }
            GameEvent::Uninstalling(_) => {
                self.set_status(&key, GameStatus::Uninstalling, generation);
            }
            GameEvent::Uninstalled(_) => {
                self.set_status(&key, GameStatus::NotInstalled, generation);
            }
            GameEvent::DownloadQueued(queued) => {
                if self.set_status(&key, GameStatus::Downloading, generation) {
                    let entry = DownloadQueueEntry::new(key, queued.game_title, queued.download_size)
                        .with_downloaded(queued.downloaded);
                    self.downloads.enqueue(entry);
                }
            }
            GameEvent::DownloadExternal(external) => {
                if self.set_status(&key, GameStatus::Downloading, generation) {
                    let entry = DownloadQueueEntry::external(
                        key,
                        external.game_title,
                        external.download_size,
                    );
                    self.downloads.enqueue(entry);
                }
            }
            GameEvent::DownloadProgress(progress) => {
                self.downloads.update_progress(&key, progress.downloaded);
            }
            GameEvent::Installing(_) => {
                self.set_status(&key, GameStatus::Installing, generation);
                self.downloads.mark_fully_downloaded(&key);
            }
            GameEvent::Installed(_) => {
                self.set_status(&key, GameStatus::Installed, generation);
                self.downloads.complete(&key);
            }
        }

        generation
    }

    /// Patches the record's status. Returns `false` only when the change is
    /// not a lifecycle edge; an unknown game still counts as accepted since
    /// events may arrive before the first snapshot.
    fn set_status(&self, key: &GameKey, status: GameStatus, generation: u64) -> bool {
        match self
            .catalog
            .apply_patch(key, GamePatch::Status(status), generation)
        {
            Ok(outcome) => {
                trace!(game = %key, ?outcome, "status patch");
                true
            }
            Err(CatalogError::UnknownKey(_)) => true,
            Err(CatalogError::InvalidTransition { .. }) => false,
        }
    }

    /// Consumes `events` in order until the stream ends or `cancel` fires.
    pub async fn run<S>(self, events: S, cancel: CancellationToken)
    where
        S: Stream<Item = EventMessage>,
    {
        tokio::pin!(events);
        let mut processed: u64 = 0;
        let mut dropped: u64 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("event dispatcher cancelled");
                    break;
                }

                msg = events.next() => {
                    match msg {
                        Some(msg) => match self.handle_message(&msg) {
                            Some(_) => processed += 1,
                            None => dropped += 1,
                        },
                        None => {
                            debug!("event channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!(processed, dropped, "event dispatcher stopped");
    }

    /// Spawns the consumer loop on the current tokio runtime.
    pub fn spawn(self, config: DispatcherConfig, cancel: CancellationToken) -> DispatcherHandle {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let events = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });
        let task = tokio::spawn(self.run(events, cancel.clone()));

        DispatcherHandle {
            events: tx,
            cancel,
            task,
        }
    }
}

/// Sending side of a spawned dispatcher.
#[derive(Debug)]
pub struct DispatcherHandle {
    events: mpsc::Sender<EventMessage>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// A sender for the event channel (e.g. for a transport read loop).
    pub fn sender(&self) -> mpsc::Sender<EventMessage> {
        self.events.clone()
    }

    /// Queues one envelope, waiting while the channel is full.
    ///
    /// Returns `false` if the consumer has stopped.
    pub async fn send(&self, msg: EventMessage) -> bool {
        self.events.send(msg).await.is_ok()
    }

    /// Stops the consumer without draining the channel.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Closes the channel and waits until every event already sent has been
    /// processed. Senders obtained through [`sender`](Self::sender) must be
    /// dropped first or this waits for them.
    pub async fn shutdown(self) {
        drop(self.events);
        if let Err(e) = self.task.await {
            warn!(error = %e, "event dispatcher task failed");
        }
    }
}
