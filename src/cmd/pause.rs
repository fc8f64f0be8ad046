//! Explicit `Paused` transitions. Nothing else enters or leaves that state.

use crate::app::App;
use crate::error::ArchiveErrorContext;
use crate::model::SyncStatus;
use crate::out;
use crate::Cli;
use anyhow::{bail, Result};
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Chat ID
    #[arg(long = "chat", value_name = "CHAT_ID")]
    pub chat_id: i64,
}

pub async fn pause(cli: &Cli, args: &ChatArgs) -> Result<()> {
    let app = App::new(cli).await?;
    let state = app
        .states
        .set_status(args.chat_id, SyncStatus::Paused, None)
        .await
        .context_chat(args.chat_id)?;

    out::emit(cli.output, &state, || {
        format!("Chat {} paused.\n", state.chat_id)
    })
}

pub async fn resume(cli: &Cli, args: &ChatArgs) -> Result<()> {
    let app = App::new(cli).await?;
    let current = app.states.load(args.chat_id).await;
    if current.status != SyncStatus::Paused {
        bail!("Chat {} is not paused (status: {})", args.chat_id, current.status);
    }

    let state = app
        .states
        .set_status(args.chat_id, SyncStatus::Idle, None)
        .await
        .context_chat(args.chat_id)?;

    out::emit(cli.output, &state, || {
        format!("Chat {} resumed.\n", state.chat_id)
    })
}
