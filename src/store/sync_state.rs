use super::{read_json, write_json_atomic};
use crate::error::ArchiveError;
use crate::model::{SyncState, SyncStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Per-chat sync checkpoints, cached in memory and persisted as
/// `sync_state_<chat_id>.json` in the state directory.
///
/// Every operation runs under one lock. Callers only ever see clones.
pub struct SyncStateStore {
    dir: PathBuf,
    states: Mutex<HashMap<i64, SyncState>>,
}

impl SyncStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn state_path(&self, chat_id: i64) -> PathBuf {
        self.dir.join(format!("sync_state_{}.json", chat_id))
    }

    /// Cached state, else the durable record, else a fresh idle state.
    pub async fn load(&self, chat_id: i64) -> SyncState {
        let mut states = self.states.lock().await;
        self.cached_or_read(&mut states, chat_id).clone()
    }

    /// Re-read the durable record, replacing the cached copy.
    ///
    /// Picks up `pause`, `resume` and `reset` written by another process.
    /// A missing or unreadable file keeps whatever is cached.
    pub async fn refresh(&self, chat_id: i64) -> SyncState {
        let mut states = self.states.lock().await;
        let path = self.state_path(chat_id);
        match read_json::<SyncState>(&path) {
            Ok(Some(durable)) if durable.chat_id == chat_id => {
                if states.get(&chat_id) != Some(&durable) {
                    log::debug!("Chat {} state changed on disk, reloading", chat_id);
                }
                states.insert(chat_id, durable);
            }
            Ok(_) => {}
            Err(e) => log::warn!("Unreadable sync state {}: {}; keeping cached", path.display(), e),
        }
        self.cached_or_read(&mut states, chat_id).clone()
    }

    /// Replace the state for `state.chat_id` and persist it.
    #[allow(dead_code)]
    pub async fn save(&self, state: SyncState) -> Result<(), ArchiveError> {
        let mut states = self.states.lock().await;
        let path = self.state_path(state.chat_id);
        states.insert(state.chat_id, state.clone());
        write_json_atomic(&path, &state).await?;
        log::debug!("Saved sync state for chat {}", state.chat_id);
        Ok(())
    }

    /// Record `message_id` as processed if it is newer than the checkpoint.
    ///
    /// Returns `Ok(false)` without touching anything for ids at or below the
    /// current checkpoint, which makes re-delivery after a crash harmless.
    pub async fn advance_last_processed(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<bool, ArchiveError> {
        let mut states = self.states.lock().await;
        let state = self.cached_or_read(&mut states, chat_id);
        if message_id <= state.last_processed_message_id {
            return Ok(false);
        }

        state.last_processed_message_id = message_id;
        state.total_processed_messages += 1;
        state.last_sync_date = Utc::now();
        let snapshot = state.clone();

        write_json_atomic(&self.state_path(chat_id), &snapshot).await?;
        Ok(true)
    }

    /// Zero the checkpoint so the next cycle re-archives from the start.
    pub async fn reset(&self, chat_id: i64) -> Result<SyncState, ArchiveError> {
        let mut states = self.states.lock().await;
        let now = Utc::now();
        let state = SyncState {
            last_sync_date: now,
            last_full_sync_date: Some(now),
            ..SyncState::new(chat_id)
        };
        states.insert(chat_id, state.clone());
        write_json_atomic(&self.state_path(chat_id), &state).await?;
        log::info!("Reset sync state for chat {}", chat_id);
        Ok(state)
    }

    pub async fn set_status(
        &self,
        chat_id: i64,
        status: SyncStatus,
        error_message: Option<String>,
    ) -> Result<SyncState, ArchiveError> {
        let mut states = self.states.lock().await;
        let state = self.cached_or_read(&mut states, chat_id);
        state.status = status;
        state.error_message = error_message;
        state.last_sync_date = Utc::now();
        let snapshot = state.clone();

        write_json_atomic(&self.state_path(chat_id), &snapshot).await?;
        log::debug!("Chat {} is now {}", chat_id, status);
        Ok(snapshot)
    }

    /// Snapshot of every cached state, ordered by chat id.
    pub async fn list_all(&self) -> Vec<SyncState> {
        let states = self.states.lock().await;
        let mut all: Vec<SyncState> = states.values().cloned().collect();
        all.sort_by_key(|s| s.chat_id);
        all
    }

    fn cached_or_read<'a>(
        &self,
        states: &'a mut HashMap<i64, SyncState>,
        chat_id: i64,
    ) -> &'a mut SyncState {
        states
            .entry(chat_id)
            .or_insert_with(|| read_state(&self.state_path(chat_id), chat_id))
    }
}

fn read_state(path: &Path, chat_id: i64) -> SyncState {
    match read_json::<SyncState>(path) {
        Ok(Some(state)) if state.chat_id == chat_id => {
            log::debug!(
                "Loaded sync state for chat {}: last message {}",
                chat_id,
                state.last_processed_message_id
            );
            state
        }
        Ok(Some(state)) => {
            log::warn!(
                "{} belongs to chat {}, not {}; starting fresh",
                path.display(),
                state.chat_id,
                chat_id
            );
            SyncState::new(chat_id)
        }
        Ok(None) => SyncState::new(chat_id),
        Err(e) => {
            log::error!("Unreadable sync state {}: {}; starting fresh", path.display(), e);
            SyncState::new(chat_id)
        }
    }
}
