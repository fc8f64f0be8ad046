use crate::app::App;
use crate::error::ArchiveErrorContext;
use crate::out;
use crate::Cli;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Zero the session counters and save
    #[arg(long, default_value_t = false)]
    pub reset: bool,
}

pub async fn run(cli: &Cli, args: &StatsArgs) -> Result<()> {
    let app = App::new(cli).await?;

    if args.reset {
        app.stats.reset_session().await;
        app.stats.save_snapshot().await.context_statistics()?;
        if !cli.output.is_json() && !cli.output.is_none() {
            println!("Statistics reset ({}).", app.stats.path().display());
            return Ok(());
        }
    }

    let stats = app.stats.snapshot().await;
    out::emit(cli.output, &stats, || {
        out::report::format_statistics_report(&stats)
    })
}
