mod cli;
mod models;
mod notify;
mod storage;
mod store;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use notify::{DesktopNotifier, ReminderScheduler};
use storage::Storage;
use store::TaskStore;
use ui::run_tui;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            use clap_complete::{generate, Shell};
            let shell = shell.to_lowercase();
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "elvish" => Shell::Elvish,
                "powershell" => Shell::PowerShell,
                _ => {
                    println!("Unsupported shell: {}", shell);
                    return Ok(());
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "flow", &mut std::io::stdout());
        }
        None => {
            let storage = match cli.data_dir {
                Some(dir) => Storage::open(dir)?,
                None => Storage::open_default()?,
            };
            log::debug!("task file at {}", storage.path().display());

            let mut scheduler = ReminderScheduler::new(Box::new(DesktopNotifier));
            scheduler.request_permission();

            let mut store = TaskStore::new(storage, scheduler);
            store.load();
            run_tui(store)?;
        }
    }

    Ok(())
}
