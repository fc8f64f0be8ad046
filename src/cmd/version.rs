use crate::out;
use crate::Cli;
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

pub fn run(cli: &Cli) -> Result<()> {
    let info = VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    };
    out::emit(cli.output, &info, || format!("{} {}\n", info.name, info.version))
}
