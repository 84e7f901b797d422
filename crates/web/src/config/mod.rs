//! Configuration loading.
//!
//! The configuration is a TOML document read once at start-up and handed to
//! the [`Server`](crate::Server) and the [`Logger`](crate::Logger) as an
//! explicit value. A document may select a profile with a top-level
//! `profile = "<name>"` key; the `[profiles.<name>]` table is then merged
//! over the root, key by key, before anything is read from it.
//!
//! ```toml
//! profile = "dev"
//!
//! [server]
//! port = 80
//!
//! [profiles.dev.server]
//! port = 8080
//! ```

mod error;

pub use error::ConfigError;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use toml::{Table, Value};

use crate::logger::{LogLevel, RotationPolicy};
use crate::utils::ensure;

const PROFILE_KEY: &str = "profile";
const PROFILES_KEY: &str = "profiles";
const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub log: LogConfig,
    #[serde(skip)]
    raw: Table,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    /// PEM certificate chain, required for `https`.
    pub cert: Option<PathBuf>,
    /// PEM private key, required for `https`.
    pub key: Option<PathBuf>,
    /// Largest request body read, in bytes; larger requests get a `413` envelope.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            host: "127.0.0.1".into(),
            port: 8080,
            cert: None,
            key: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    Kb,
    #[default]
    Mb,
    Gb,
    Tb,
}

impl SizeUnit {
    pub fn bytes(self) -> u64 {
        match self {
            SizeUnit::Kb => 1 << 10,
            SizeUnit::Mb => 1 << 20,
            SizeUnit::Gb => 1 << 30,
            SizeUnit::Tb => 1 << 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub console: bool,
    /// Roll the log file by size.
    pub rolling_file: bool,
    pub max_size: u64,
    pub size_unit: SizeUnit,
    /// Roll the log file by date.
    pub daily_file: bool,
    pub dir: PathBuf,
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::All,
            console: true,
            rolling_file: false,
            max_size: 10,
            size_unit: SizeUnit::Mb,
            daily_file: false,
            dir: PathBuf::from("logs"),
            file: "cosine.log".into(),
        }
    }
}

impl LogConfig {
    /// The file rotation policy, or `None` when no log file is written.
    pub fn rotation(&self) -> Option<RotationPolicy> {
        if self.rolling_file {
            Some(RotationPolicy::Size { max_bytes: self.max_size.saturating_mul(self.size_unit.bytes()) })
        } else if self.daily_file {
            Some(RotationPolicy::Daily)
        } else {
            None
        }
    }
}

impl Config {
    /// Reads and validates the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        content.parse()
    }

    /// Looks a raw value up by its dotted key, e.g. `"server.port"`.
    ///
    /// Any key of the document can be read this way, including keys the
    /// typed sections do not know about.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.raw.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.protocol == Protocol::Https {
            ensure!(self.server.cert.is_some(), ConfigError::invalid("server.cert", "required when protocol is https"));
            ensure!(self.server.key.is_some(), ConfigError::invalid("server.key", "required when protocol is https"));
        }

        ensure!(self.server.max_body_size > 0, ConfigError::invalid("server.max_body_size", "must be positive"));

        if self.log.rolling_file {
            ensure!(self.log.max_size > 0, ConfigError::invalid("log.max_size", "must be positive for rolling files"));
            ensure!(
                !self.log.daily_file,
                ConfigError::invalid("log.daily_file", "can't be combined with log.rolling_file")
            );
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut root: Table = s.parse()?;
        apply_profile(&mut root)?;

        let mut config: Config = Value::Table(root.clone()).try_into()?;
        config.raw = root;
        config.validate()?;
        Ok(config)
    }
}

fn apply_profile(root: &mut Table) -> Result<(), ConfigError> {
    let profile = match root.remove(PROFILE_KEY) {
        Some(Value::String(name)) => Some(name),
        Some(_) => return Err(ConfigError::invalid(PROFILE_KEY, "must be a string")),
        None => None,
    };
    let mut profiles = match root.remove(PROFILES_KEY) {
        Some(Value::Table(profiles)) => profiles,
        Some(_) => return Err(ConfigError::invalid(PROFILES_KEY, "must be a table")),
        None => Table::new(),
    };

    let Some(name) = profile else {
        return Ok(());
    };
    let key = format!("{PROFILES_KEY}.{name}");
    match profiles.remove(&name) {
        Some(Value::Table(overlay)) => {
            merge(root, overlay);
            Ok(())
        }
        Some(_) => Err(ConfigError::invalid(key, "must be a table")),
        None => Err(ConfigError::invalid(key, "profile is not defined")),
    }
}

/// Merges `overlay` into `base`; nested tables merge, everything else is replaced.
fn merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        if let Value::Table(overlay_table) = value {
            if let Some(Value::Table(base_table)) = base.get_mut(&key) {
                merge(base_table, overlay_table);
                continue;
            }
            base.insert(key, Value::Table(overlay_table));
        } else {
            base.insert(key, value);
        }
    }
}
