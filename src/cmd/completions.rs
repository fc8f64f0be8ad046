use crate::Cli;
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, Shell};

/// Print a completion script for `shell` to stdout.
pub fn run(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
    Ok(())
}
