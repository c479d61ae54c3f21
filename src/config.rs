//! Loading of the [BackupConfig] from a TOML file.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Weekday;
use derive_more::{Display, Error, From};

const DEFAULT_DUMP_TOOL: &str = "mongodump";

/// Configuration of a backup invocation. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct BackupConfig {
    /// Name of the database to dump.
    pub database_name: String,

    /// Connection URI passed to the dump tool.
    pub uri: String,

    /// Collections to dump. The order is the backup order.
    pub collections: Vec<String>,

    /// Local folder the dated backup folders are created in.
    pub backup_root: PathBuf,

    /// Day of the week the weekly backup runs on, e.g. `"Sunday"`.
    pub weekly_backup_day: Weekday,

    /// Executable of the dump tool. Looked up in `PATH` if not absolute.
    #[serde(default = "default_dump_tool")]
    pub dump_tool: PathBuf,

    /// Credentials of the Telegram bot reports are sent with.
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

fn default_dump_tool() -> PathBuf {
    PathBuf::from(DEFAULT_DUMP_TOOL)
}

/// Credentials of the Telegram notification channel.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct TelegramConfig {
    /// Bot API token.
    pub token: String,
    /// Destination chat id, e.g. `"-1001234567890"` or `"@channel"`.
    pub chat_id: String,
}

impl TelegramConfig {
    /// Both token and chat id are set.
    pub fn is_complete(&self) -> bool {
        !self.token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

#[derive(Debug, Display, Error, From)]
/// Errors on loading the [BackupConfig].
pub enum ConfigError {
    /// The config file can't be read.
    #[display("Reading config file failed: {_0}")]
    #[from]
    Read(io::Error),
    /// The config file is no valid TOML or misses keys.
    #[display("Config file is malformed: {_0}")]
    #[from]
    Parse(toml::de::Error),
    /// A value is present but not usable.
    #[display("Invalid configuration: {_0}")]
    Invalid(#[error(ignore)] String),
}

impl BackupConfig {
    /// Read and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::debug!(target: "config", "Loading config from {}", path.display());
        let config_str = std::fs::read_to_string(path)?;
        config_str.parse()
    }

    /// Check values serde can't check for us.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_name.trim().is_empty() {
            return Err(ConfigError::Invalid("database_name is empty".into()));
        }
        if self.uri.trim().is_empty() {
            return Err(ConfigError::Invalid("uri is empty".into()));
        }
        if self.collections.is_empty() {
            return Err(ConfigError::Invalid("no collections configured".into()));
        }

        let mut seen = HashSet::new();
        for collection in &self.collections {
            if collection.trim().is_empty() {
                return Err(ConfigError::Invalid("empty collection name".into()));
            }
            if !seen.insert(collection.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "collection '{collection}' is listed twice"
                )));
            }
        }

        if self.backup_root.is_relative() {
            log::warn!(target: "config", "backup_root is relative: {}", self.backup_root.display());
        }

        Ok(())
    }

    /// Telegram credentials, if they are completely configured.
    pub fn telegram(&self) -> Option<&TelegramConfig> {
        self.telegram.as_ref().filter(|t| t.is_complete())
    }
}

impl std::str::FromStr for BackupConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: BackupConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
