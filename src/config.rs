//! Archiver configuration.
//!
//! Everything lives under the store directory. `<store>/config.json` is
//! optional and every field has a default; relative paths in it are resolved
//! against the store directory.

use crate::retry::RetryPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.json";

/// A chat to archive. The title names the archive directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTarget {
    pub id: i64,
    pub title: String,
}

impl std::str::FromStr for ChatTarget {
    type Err = anyhow::Error;

    /// `ID=TITLE`, or a bare `ID` titled `chat_<ID>`.
    fn from_str(s: &str) -> Result<Self> {
        let (id, title) = match s.split_once('=') {
            Some((id, title)) => (id.trim(), title.trim().to_string()),
            None => (s.trim(), String::new()),
        };
        let id: i64 = id
            .parse()
            .with_context(|| format!("Invalid chat id in '{}'", s))?;
        let title = if title.is_empty() {
            format!("chat_{}", id)
        } else {
            title
        };
        Ok(ChatTarget { id, title })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveConfig {
    pub output_path: PathBuf,
    pub state_path: PathBuf,
    pub inbox_path: PathBuf,
    pub archive_interval_secs: u64,
    pub batch_size: usize,
    pub max_retry_attempts: u32,
    pub base_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub chats: Vec<ChatTarget>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("archives"),
            state_path: PathBuf::from("state"),
            inbox_path: PathBuf::from("inbox"),
            archive_interval_secs: 3600,
            batch_size: 100,
            max_retry_attempts: 3,
            base_retry_delay_ms: 1000,
            max_retry_delay_ms: 60_000,
            chats: Vec::new(),
        }
    }
}

impl ArchiveConfig {
    /// Read `<store>/config.json` if present, then resolve paths.
    pub fn load(store_dir: &Path) -> Result<Self> {
        let path = store_dir.join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<ArchiveConfig>(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No {} found, using defaults", path.display());
                ArchiveConfig::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        config.resolve_paths(store_dir);
        config.validate()?;
        Ok(config)
    }

    pub fn resolve_paths(&mut self, store_dir: &Path) {
        for path in [
            &mut self.output_path,
            &mut self.state_path,
            &mut self.inbox_path,
        ] {
            if path.is_relative() {
                *path = store_dir.join(&*path);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batchSize must be at least 1");
        }
        if self.archive_interval_secs == 0 {
            bail!("archiveIntervalSecs must be at least 1");
        }
        let mut seen = std::collections::HashSet::new();
        for chat in &self.chats {
            if !seen.insert(chat.id) {
                bail!("Chat {} is configured more than once", chat.id);
            }
        }
        Ok(())
    }

    /// Chats given on the command line replace the configured list.
    pub fn with_chats(mut self, chats: &[ChatTarget]) -> Result<Self> {
        if !chats.is_empty() {
            self.chats = chats.to_vec();
        }
        self.validate()?;
        Ok(self)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.archive_interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retry_attempts,
            Duration::from_millis(self.base_retry_delay_ms),
        )
        .with_max_delay(Duration::from_millis(self.max_retry_delay_ms))
    }

    pub fn chat(&self, id: i64) -> Option<&ChatTarget> {
        self.chats.iter().find(|c| c.id == id)
    }
}
