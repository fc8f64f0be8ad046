use crate::app::App;
use crate::error::ArchiveErrorContext;
use crate::out;
use crate::Cli;
use anyhow::Result;
use clap::Args;
use std::io::{self, Write};

#[derive(Args, Debug, Clone)]
pub struct ResetArgs {
    /// Chat ID whose checkpoint to reset
    #[arg(long = "chat", value_name = "CHAT_ID")]
    pub chat_id: i64,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub confirm: bool,
}

pub async fn run(cli: &Cli, args: &ResetArgs) -> Result<()> {
    let app = App::new(cli).await?;
    let current = app.states.load(args.chat_id).await;

    if !cli.output.is_json() && !args.confirm {
        println!(
            "Chat {} is at message {} ({} archived). The next sync will append",
            current.chat_id, current.last_processed_message_id, current.total_processed_messages
        );
        println!("every message again, duplicating what the archive already holds.");
        print!("Reset? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();
        if input != "y" && input != "yes" {
            println!("Aborted.");
            return Ok(());
        }
    }

    let state = app
        .states
        .reset(args.chat_id)
        .await
        .context_chat(args.chat_id)?;

    out::emit(cli.output, &state, || {
        format!("Chat {} reset.\n", state.chat_id)
    })
}
