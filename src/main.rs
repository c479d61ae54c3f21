use std::process::ExitCode;

use chrono::Local;
use clap::Parser;

use mongo_backup_lib::cli::Cli;
use mongo_backup_lib::config::BackupConfig;
use mongo_backup_lib::dump::Mongodump;
use mongo_backup_lib::notify::{LogNotifier, Notifier, Telegram};
use mongo_backup_lib::orchestrator;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // init logger
    let mut env_logger = env_logger::builder();
    if let Some(level) = cli.verbose {
        env_logger.filter_level(level);
    }
    if let Err(e) = env_logger.try_init() {
        eprintln!("Initializing the logger failed: {e}");
    }

    let config = match BackupConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!(target: "config", "{} ({})", e, cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    let notifier: Box<dyn Notifier> = match config.telegram().map(Telegram::new) {
        Some(Ok(telegram)) => Box::new(telegram),
        Some(Err(e)) => {
            log::error!(target: "notify::telegram", "Setting up Telegram failed, reporting to the log only: {e}");
            Box::new(LogNotifier)
        }
        None => {
            log::warn!(target: "notify", "Telegram token or chat id not configured, reporting to the log only");
            Box::new(LogNotifier)
        }
    };

    let tool = Mongodump::with_program(&config.dump_tool);
    let today = Local::now().date_naive();

    orchestrator::execute(&config, &tool, &notifier, today, cli.kind).into()
}
