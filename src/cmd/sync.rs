use crate::app::App;
use crate::config::ChatTarget;
use crate::error::ArchiveError;
use crate::lease::PollerLease;
use crate::out;
use crate::shutdown::ShutdownController;
use crate::Cli;
use anyhow::{bail, Result};
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Chat to archive as ID=TITLE (repeatable, replaces configured chats)
    #[arg(long = "chat", value_name = "ID=TITLE")]
    pub chats: Vec<ChatTarget>,

    /// Messages to request per fetch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Suppress progress output
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

pub async fn run(cli: &Cli, args: &SyncArgs, shutdown: &ShutdownController) -> Result<()> {
    let mut app = App::new(cli).await?;
    app.apply_overrides(&args.chats, None, args.batch_size)?;

    if app.config.chats.is_empty() {
        bail!("No chats configured. Add them to config.json or pass --chat ID=TITLE.");
    }

    if !args.no_progress {
        eprintln!(
            "Archiving {} chat(s) into {}…",
            app.config.chats.len(),
            app.writer.root().display()
        );
    }

    let _lease = PollerLease::acquire_in(&app.config.state_path)?;
    let summary = match app.run_cycle(&shutdown.child_token()).await {
        Ok(summary) => summary,
        Err(ArchiveError::Cancelled) => {
            eprintln!("Interrupted, progress so far is saved.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if !args.no_progress {
        eprintln!(
            "Sync complete: {} chat(s), {} message(s), {} new file(s), {} failed",
            summary.chats_processed,
            summary.messages_archived,
            summary.files_created,
            summary.chats_failed
        );
    }

    out::emit(cli.output, &summary, || {
        let mut text = format!(
            "Archived {} message(s) from {} chat(s)\n",
            summary.messages_archived, summary.chats_processed
        );
        if summary.chats_skipped > 0 {
            text.push_str(&format!("Skipped {} paused chat(s)\n", summary.chats_skipped));
        }
        if summary.chats_failed > 0 {
            text.push_str(&format!(
                "{} chat(s) failed, see `status` for details\n",
                summary.chats_failed
            ));
        }
        text
    })
}
