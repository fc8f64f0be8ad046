mod app;
mod archive;
mod cmd;
mod config;
mod error;
mod lease;
mod model;
mod out;
mod retry;
mod shutdown;
mod source;
mod store;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tgarchiver",
    version,
    about = "Incremental Markdown archiver for chat messages"
)]
pub struct Cli {
    /// Store directory (default: ~/.tgarchiver)
    #[arg(long, global = true, default_value = "~/.tgarchiver")]
    pub store: String,

    /// Output mode: text (default), json, or none
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub output: out::OutputMode,

    #[command(subcommand)]
    pub command: cmd::Command,
}

impl Cli {
    pub fn store_dir(&self) -> String {
        expand_home(&self.store, std::env::var("HOME").ok().as_deref())
    }
}

fn expand_home(path: &str, home: Option<&str>) -> String {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let shutdown = shutdown::ShutdownController::new();
    shutdown.listen_for_ctrl_c();

    if let Err(e) = cmd::run(cli, &shutdown).await {
        // Don't report error if we're shutting down gracefully
        if shutdown.is_triggered() {
            std::process::exit(0);
        }
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
