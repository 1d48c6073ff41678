use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "daybook",
    version,
    about = "Terminal journal calendar with infinite month scrolling"
)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Entry dataset, JSON or YAML (overrides the config file)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config file if none exists
    Init,
    /// List entries grouped by day
    List {
        /// Only show one month, as YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Print a month grid, marking days that have entries
    Month {
        /// Month as YYYY-MM (defaults to the current month)
        month: Option<String>,
    },
    /// Launch the interactive TUI
    Tui,
}
