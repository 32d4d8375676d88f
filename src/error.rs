use std::path::PathBuf;
use thiserror::Error;

/// Library-level failures. Request handling never produces these; they only
/// surface while starting listeners or loading configuration.
#[derive(Debug, Error)]
pub enum HoneypotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse profile keyword map: {0}")]
    ProfileMap(#[from] serde_json::Error),

    #[error("SSH host key error: {0}")]
    HostKey(String),

    #[error("failed to bind {service} listener on {addr}: {source}")]
    Bind {
        service: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, HoneypotError>;
