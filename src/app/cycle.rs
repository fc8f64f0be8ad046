use super::App;
use crate::config::ChatTarget;
use crate::error::ArchiveError;
use crate::model::SyncStatus;
use crate::source::MessageSource;
use serde::Serialize;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// What one polling cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub chats_processed: u64,
    pub chats_skipped: u64,
    pub chats_failed: u64,
    pub messages_archived: u64,
    pub files_created: u64,
}

#[derive(Debug, Default)]
struct ChatOutcome {
    messages_archived: u64,
    files_created: u64,
}

impl<S: MessageSource> App<S> {
    /// Archive new messages for every configured chat, one chat at a time.
    ///
    /// A failing chat is marked `Error` and the cycle moves on. The only
    /// error this returns is [`ArchiveError::Cancelled`].
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleSummary, ArchiveError> {
        let mut summary = CycleSummary::default();

        for chat in &self.config.chats {
            if cancel.is_cancelled() {
                self.save_statistics().await;
                return Err(ArchiveError::Cancelled);
            }

            let state = self.states.refresh(chat.id).await;
            if state.status == SyncStatus::Paused {
                log::info!("Chat {} ({}) is paused, skipping", chat.id, chat.title);
                summary.chats_skipped += 1;
                continue;
            }

            match self.archive_chat(chat, cancel).await {
                Ok(outcome) => {
                    summary.chats_processed += 1;
                    summary.messages_archived += outcome.messages_archived;
                    summary.files_created += outcome.files_created;
                    if let Err(e) = self.states.set_status(chat.id, SyncStatus::Idle, None).await {
                        log::error!("Failed to mark chat {} idle: {}", chat.id, e);
                    }
                    if outcome.messages_archived > 0 {
                        log::info!(
                            "Chat {} ({}): archived {} message(s)",
                            chat.id,
                            chat.title,
                            outcome.messages_archived
                        );
                    }
                }
                Err(e) if e.is_cancelled() => {
                    log::info!("Cycle cancelled while archiving chat {}", chat.id);
                    self.save_statistics().await;
                    return Err(e);
                }
                Err(e) => {
                    let kind = if e.is_transient() { "gave up after retries" } else { "permanent" };
                    log::error!(
                        "Archiving chat {} ({}) failed, {}: {}",
                        chat.id,
                        chat.title,
                        kind,
                        e
                    );
                    summary.chats_failed += 1;
                    if let Err(se) = self
                        .states
                        .set_status(chat.id, SyncStatus::Error, Some(e.to_string()))
                        .await
                    {
                        log::error!("Failed to record error state for chat {}: {}", chat.id, se);
                    }
                    self.stats
                        .record_error(&format!("archiving chat {}", chat.id), Some(&e))
                        .await;
                }
            }
        }

        self.save_statistics().await;
        Ok(summary)
    }

    /// Run cycles every configured interval until `cancel` fires.
    ///
    /// Returns the number of cycles that completed.
    pub async fn run_loop(&self, cancel: &CancellationToken) -> u64 {
        let mut completed = 0u64;
        loop {
            match self.run_cycle(cancel).await {
                Ok(summary) => {
                    completed += 1;
                    log::info!(
                        "Cycle {} done: {} chat(s), {} message(s), {} failed",
                        completed,
                        summary.chats_processed,
                        summary.messages_archived,
                        summary.chats_failed
                    );
                }
                Err(_) => break,
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval()) => {}
            }
        }
        log::info!("Polling loop stopped after {} cycle(s)", completed);
        completed
    }

    async fn archive_chat(
        &self,
        chat: &ChatTarget,
        cancel: &CancellationToken,
    ) -> Result<ChatOutcome, ArchiveError> {
        let state = self
            .states
            .set_status(chat.id, SyncStatus::InProgress, None)
            .await?;
        let retry = self.config.retry_policy();
        let limit = self.config.batch_size;

        let mut last = state.last_processed_message_id;
        let mut outcome = ChatOutcome::default();

        loop {
            let after = last;
            let batch = retry
                .execute(|| self.source.fetch_after(chat.id, after, limit), cancel)
                .await?;
            let fetched = batch.len();

            for message in batch {
                if cancel.is_cancelled() {
                    return Err(ArchiveError::Cancelled);
                }
                if message.id <= last {
                    log::debug!("Skipping already archived message {}", message.id);
                    continue;
                }

                let started = Instant::now();
                let appended = self.writer.append_message(&message, &chat.title).await?;
                if appended.created {
                    log::debug!("Chat {} opened {}", chat.id, appended.path.display());
                    self.stats.record_archive_created().await;
                    outcome.files_created += 1;
                }
                if let Some(size) = message.downloaded_media_size() {
                    self.stats.record_media_download(size).await;
                }
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                self.stats.record_message_processed(&message, elapsed_ms).await;

                self.states.advance_last_processed(chat.id, message.id).await?;
                last = message.id;
                outcome.messages_archived += 1;
            }

            if fetched < limit || last == after {
                break;
            }
        }

        Ok(outcome)
    }

    async fn save_statistics(&self) {
        if let Err(e) = self.stats.save_snapshot().await {
            log::error!("Failed to save statistics: {}", e);
        }
    }
}
