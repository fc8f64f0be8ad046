pub mod cycle;

use crate::archive::ArchiveWriter;
use crate::config::{ArchiveConfig, ChatTarget};
use crate::error::ArchiveErrorContext;
use crate::source::{InboxSource, MessageSource};
use crate::store::{StatisticsAggregator, SyncStateStore};
use crate::Cli;
use anyhow::Result;
use std::path::PathBuf;

/// Everything a command needs: configuration plus the stateful services,
/// all rooted in one store directory.
pub struct App<S = InboxSource> {
    pub store_dir: PathBuf,
    pub config: ArchiveConfig,
    pub source: S,
    pub writer: ArchiveWriter,
    pub states: SyncStateStore,
    pub stats: StatisticsAggregator,
}

impl App<InboxSource> {
    pub async fn new(cli: &Cli) -> Result<Self> {
        let store_dir = cli.store_dir();
        std::fs::create_dir_all(&store_dir).context_store(&store_dir)?;
        let store_dir = PathBuf::from(store_dir);

        let config = ArchiveConfig::load(&store_dir)?;

        let source = InboxSource::new(&config.inbox_path);
        Ok(Self::with_source(store_dir, config, source).await)
    }
}

impl<S: MessageSource> App<S> {
    /// Wire up the services for `config`, merging any saved statistics.
    pub async fn with_source(store_dir: PathBuf, config: ArchiveConfig, source: S) -> Self {
        let stats = StatisticsAggregator::new(&config.state_path);
        if let Err(e) = stats.load_snapshot().await {
            log::warn!("Ignoring unreadable statistics snapshot: {}", e);
        }

        App {
            writer: ArchiveWriter::new(&config.output_path),
            states: SyncStateStore::new(&config.state_path),
            stats,
            store_dir,
            config,
            source,
        }
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(
        &mut self,
        chats: &[ChatTarget],
        interval_secs: Option<u64>,
        batch_size: Option<usize>,
    ) -> Result<()> {
        let mut config = self.config.clone().with_chats(chats)?;
        if let Some(secs) = interval_secs {
            config.archive_interval_secs = secs;
        }
        if let Some(size) = batch_size {
            config.batch_size = size;
        }
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Chat ids to report on: the configured chats plus any that already
    /// have state in the cache.
    pub async fn known_chat_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.config.chats.iter().map(|c| c.id).collect();
        for state in self.states.list_all().await {
            if !ids.contains(&state.chat_id) {
                ids.push(state.chat_id);
            }
        }
        ids.sort_unstable();
        ids
    }
}
