pub mod completions;
pub mod pause;
pub mod reset;
pub mod run;
pub mod stats;
pub mod status;
pub mod sync;
pub mod version;

use crate::shutdown::ShutdownController;
use crate::Cli;
use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Archive new messages for all configured chats once
    Sync(sync::SyncArgs),
    /// Archive on an interval until Ctrl+C
    Run(run::RunArgs),
    /// Show per-chat sync state
    Status(status::StatusArgs),
    /// Show processing statistics
    Stats(stats::StatsArgs),
    /// Reset a chat's checkpoint so it is archived again from the start
    Reset(reset::ResetArgs),
    /// Stop archiving a chat until it is resumed
    Pause(pause::ChatArgs),
    /// Resume archiving a paused chat
    Resume(pause::ChatArgs),
    /// Show version info
    Version,
    /// Generate shell completions
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

pub async fn run(cli: Cli, shutdown: &ShutdownController) -> anyhow::Result<()> {
    match &cli.command {
        Command::Sync(args) => sync::run(&cli, args, shutdown).await,
        Command::Run(args) => run::run(&cli, args, shutdown).await,
        Command::Status(args) => status::run(&cli, args).await,
        Command::Stats(args) => stats::run(&cli, args).await,
        Command::Reset(args) => reset::run(&cli, args).await,
        Command::Pause(args) => pause::pause(&cli, args).await,
        Command::Resume(args) => pause::resume(&cli, args).await,
        Command::Version => version::run(&cli),
        Command::Completions { shell } => completions::run(*shell),
    }
}
