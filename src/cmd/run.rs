//! Polling mode: archive every interval until Ctrl+C.

use crate::app::App;
use crate::config::ChatTarget;
use crate::lease::PollerLease;
use crate::out;
use crate::shutdown::ShutdownController;
use crate::Cli;
use anyhow::{bail, Result};
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Chat to archive as ID=TITLE (repeatable, replaces configured chats)
    #[arg(long = "chat", value_name = "ID=TITLE")]
    pub chats: Vec<ChatTarget>,

    /// Seconds between cycles
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Messages to request per fetch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Suppress progress output
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

pub async fn run(cli: &Cli, args: &RunArgs, shutdown: &ShutdownController) -> Result<()> {
    let mut app = App::new(cli).await?;
    app.apply_overrides(&args.chats, args.interval, args.batch_size)?;

    if app.config.chats.is_empty() {
        bail!("No chats configured. Add them to config.json or pass --chat ID=TITLE.");
    }

    let lease = PollerLease::acquire_in(&app.config.state_path)?;
    log::debug!(
        "Store {} locked via {}",
        app.store_dir.display(),
        lease.path().display()
    );

    if !args.quiet {
        eprintln!(
            "Archiving {} chat(s) every {}s (Ctrl+C to stop)…",
            app.config.chats.len(),
            app.config.archive_interval_secs
        );
    }

    let cycles = app.run_loop(&shutdown.child_token()).await;
    drop(lease);

    if !args.quiet {
        eprintln!("Stopped after {} cycle(s).", cycles);
    }

    let stats = app.stats.snapshot().await;
    out::emit(cli.output, &serde_json::json!({ "cycles": cycles, "statistics": stats }), || {
        out::report::format_statistics_report(&stats)
    })
}
