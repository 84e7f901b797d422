use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a [`Config`](super::Config).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file '{}' can't be read: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config is not valid toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config key '{key}' is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn invalid<K: ToString, R: ToString>(key: K, reason: R) -> Self {
        Self::Invalid { key: key.to_string(), reason: reason.to_string() }
    }
}
