use super::{read_json, write_json_atomic};
use crate::error::ArchiveError;
use crate::model::{AuthorStats, ChatMessage, ProcessingStatistics};
use chrono::Utc;
use std::path::PathBuf;
use tokio::sync::Mutex;

pub const STATISTICS_FILE: &str = "statistics.json";

/// Processing counters for the running session.
///
/// All reads and writes go through one lock; [`snapshot`](Self::snapshot)
/// hands out a deep copy.
pub struct StatisticsAggregator {
    path: PathBuf,
    stats: Mutex<ProcessingStatistics>,
}

impl StatisticsAggregator {
    /// Aggregator persisting to `<dir>/statistics.json`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(STATISTICS_FILE),
            stats: Mutex::new(ProcessingStatistics::new(Utc::now())),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub async fn record_message_processed(&self, message: &ChatMessage, processing_time_ms: f64) {
        let mut stats = self.stats.lock().await;
        stats.total_messages_processed += 1;
        stats.last_update = Utc::now();

        let n = stats.total_messages_processed as f64;
        stats.average_processing_time_ms =
            (stats.average_processing_time_ms * (n - 1.0) + processing_time_ms) / n;

        *stats.message_type_stats.entry(message.kind).or_insert(0) += 1;

        let author = stats
            .author_stats
            .entry(message.author_id)
            .or_insert_with(|| AuthorStats {
                author_id: message.author_id,
                author_name: message.author_name.clone(),
                message_count: 0,
                media_count: 0,
                first_message_date: message.date,
                last_message_date: message.date,
            });
        author.message_count += 1;
        author.last_message_date = message.date;
        if message.date < author.first_message_date {
            author.first_message_date = message.date;
        }
        if let Some(name) = message.author_name.as_ref().filter(|n| !n.is_empty()) {
            author.author_name = Some(name.clone());
        }
        if message.media.is_some() {
            author.media_count += 1;
        }

        log::debug!(
            "Recorded message {} processed in {:.1}ms",
            message.id,
            processing_time_ms
        );
    }

    pub async fn record_media_download(&self, size_bytes: u64) {
        let mut stats = self.stats.lock().await;
        stats.media_files_downloaded += 1;
        stats.total_downloaded_size_bytes += size_bytes;
        stats.last_update = Utc::now();
    }

    pub async fn record_error(&self, description: &str, cause: Option<&ArchiveError>) {
        let mut stats = self.stats.lock().await;
        stats.error_count += 1;
        stats.last_update = Utc::now();
        match cause {
            Some(e) => log::debug!("Recorded error: {}: {}", description, e),
            None => log::debug!("Recorded error: {}", description),
        }
    }

    pub async fn record_archive_created(&self) {
        let mut stats = self.stats.lock().await;
        let now = Utc::now();
        stats.archive_files_created += 1;
        stats.last_archive_time = Some(now);
        stats.last_update = now;
    }

    pub async fn snapshot(&self) -> ProcessingStatistics {
        self.stats.lock().await.clone()
    }

    /// Zero every counter and start a new session.
    pub async fn reset_session(&self) {
        let mut stats = self.stats.lock().await;
        *stats = ProcessingStatistics::new(Utc::now());
        log::info!("Session statistics reset");
    }

    pub async fn save_snapshot(&self) -> Result<(), ArchiveError> {
        let stats = self.stats.lock().await;
        write_json_atomic(&self.path, &*stats).await?;
        log::debug!("Statistics saved to {}", self.path.display());
        Ok(())
    }

    /// Merge the durable histograms from disk into the live statistics.
    ///
    /// Only the per-type and per-author maps and the archive file count are
    /// taken from the file. Session fields (start time, error count, average
    /// time) stay as they are. Returns `Ok(false)` if there was no file.
    pub async fn load_snapshot(&self) -> Result<bool, ArchiveError> {
        let mut stats = self.stats.lock().await;
        let Some(loaded) = read_json::<ProcessingStatistics>(&self.path)? else {
            log::debug!("No statistics file at {}", self.path.display());
            return Ok(false);
        };

        stats.message_type_stats = loaded.message_type_stats;
        stats.author_stats = loaded.author_stats;
        stats.archive_files_created += loaded.archive_files_created;
        log::info!("Statistics loaded from {}", self.path.display());
        Ok(true)
    }
}
