//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "lingoboard", version, about = "Replay a recorded session on a Lingoboard whiteboard")]
pub struct CliArgs {
    /// JSON configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Print the shortcut table and exit.
    #[arg(long)]
    pub shortcuts: bool,
    /// Session script to replay.
    #[arg(value_name = "SESSION")]
    pub script: Option<PathBuf>,
}
