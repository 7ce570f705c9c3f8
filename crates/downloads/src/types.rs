use chrono::{DateTime, Utc};
use fusion_protocol::GameKey;
use serde::Serialize;

/// Who drives a download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadOrigin {
    /// Started from this library and shown under "Up Next".
    #[default]
    Managed,
    /// Running in a storefront's own client; only mirrored here.
    External,
}

/// How far along a download is, for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Progress {
    /// Fraction in `0.0..=1.0`.
    Determinate { fraction: f64 },
    /// Total size unknown; only the byte count is meaningful.
    Indeterminate { downloaded: u64 },
}

/// An active download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQueueEntry {
    #[serde(flatten)]
    pub key: GameKey,
    pub title: String,
    /// 0 when the size is unknown.
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub origin: DownloadOrigin,
}

impl DownloadQueueEntry {
    pub fn new(key: GameKey, title: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            key,
            title: title.into(),
            total_bytes,
            downloaded_bytes: 0,
            origin: DownloadOrigin::Managed,
        }
    }

    pub fn external(key: GameKey, title: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            origin: DownloadOrigin::External,
            ..Self::new(key, title, total_bytes)
        }
    }

    pub fn with_downloaded(mut self, downloaded_bytes: u64) -> Self {
        self.downloaded_bytes = downloaded_bytes;
        self
    }

    pub fn progress(&self) -> Progress {
        if self.total_bytes == 0 {
            Progress::Indeterminate {
                downloaded: self.downloaded_bytes,
            }
        } else {
            let fraction = self.downloaded_bytes as f64 / self.total_bytes as f64;
            Progress::Determinate {
                fraction: fraction.min(1.0),
            }
        }
    }
}

/// A finished download, kept until the user clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedDownloadEntry {
    #[serde(flatten)]
    pub download: DownloadQueueEntry,
    pub completed_at: DateTime<Utc>,
}

impl CompletedDownloadEntry {
    pub fn key(&self) -> &GameKey {
        &self.download.key
    }
}

/// Point-in-time copy of the pipeline, emitted to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadsSnapshot {
    pub queue: Vec<DownloadQueueEntry>,
    pub completed: Vec<CompletedDownloadEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_protocol::GameSource;

    fn key() -> GameKey {
        GameKey::new("a", GameSource::Itchio)
    }

    #[test]
    fn progress_with_known_total() {
        let entry = DownloadQueueEntry::new(key(), "Foo", 1000).with_downloaded(250);
        assert_eq!(entry.progress(), Progress::Determinate { fraction: 0.25 });
    }

    #[test]
    fn progress_without_total_is_indeterminate() {
        let entry = DownloadQueueEntry::external(key(), "Foo", 0).with_downloaded(42);
        assert_eq!(entry.progress(), Progress::Indeterminate { downloaded: 42 });
    }

    #[test]
    fn progress_fraction_is_capped() {
        let entry = DownloadQueueEntry::new(key(), "Foo", 100).with_downloaded(150);
        assert_eq!(entry.progress(), Progress::Determinate { fraction: 1.0 });
    }

    #[test]
    fn serializes_camel_case() {
        let entry = DownloadQueueEntry::external(key(), "Foo", 10);
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["id"], "a");
        assert_eq!(v["source"], "itchio");
        assert_eq!(v["totalBytes"], 10);
        assert_eq!(v["origin"], "external");
    }
}
