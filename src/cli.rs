use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Single-screen to-do list with reminders", long_about = None)]
pub struct Cli {
    /// Keep the task file under this directory instead of the platform
    /// data directory
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completion scripts
    Completions {
        #[arg(value_name = "SHELL")]
        shell: String,
    },
}
