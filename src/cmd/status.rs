use crate::app::App;
use crate::out;
use crate::Cli;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Only show these chat IDs
    #[arg(long = "chat", value_name = "CHAT_ID")]
    pub chat_ids: Vec<i64>,
}

pub async fn run(cli: &Cli, args: &StatusArgs) -> Result<()> {
    let app = App::new(cli).await?;

    let ids = if args.chat_ids.is_empty() {
        app.known_chat_ids().await
    } else {
        args.chat_ids.clone()
    };

    let mut states = Vec::with_capacity(ids.len());
    for id in ids {
        states.push(app.states.load(id).await);
    }

    out::emit(cli.output, &states, || {
        let mut text = out::report::format_sync_states(&states);
        let titled: Vec<_> = states
            .iter()
            .filter_map(|s| app.config.chat(s.chat_id))
            .collect();
        if !titled.is_empty() {
            text.push_str("\nChats:\n");
            for chat in titled {
                text.push_str(&format!("  {:<16} {}\n", chat.id, chat.title));
            }
        }
        text
    })
}
