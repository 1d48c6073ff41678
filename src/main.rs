mod calendar;
mod carousel;
mod cli;
mod clock;
mod commands;
mod index;
mod logging;
mod model;
mod scroll;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let _log_guard = logging::init(&storage::log_dir()?)?;
    let command = args.command.unwrap_or(cli::Command::Tui);
    let result = match command {
        cli::Command::Init => commands::init(args.config),
        cli::Command::List { month } => commands::list(args.config, args.data, month),
        cli::Command::Month { month } => commands::month(args.config, args.data, month),
        cli::Command::Tui => commands::tui(args.config, args.data),
    };
    if let Err(err) = &result {
        tracing::error!(error = %err, "command failed");
    }
    result
}
