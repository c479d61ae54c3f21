use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::schedule::Kind;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbosity of the command output.
    #[arg(long)]
    pub verbose: Option<LevelFilter>,

    /// Path of the TOML configuration file.
    #[arg(long, short = 'c', env = "MONGO_BACKUP_CONFIG", default_value = "config.toml")]
    pub config: PathBuf,

    /// Run this kind of backup regardless of the date.
    ///
    /// Without it the kinds due today are determined automatically.
    #[arg(long = "type", value_enum)]
    pub kind: Option<Kind>,
}
