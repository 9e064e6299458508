use std::path::PathBuf;

use berth_core::ParamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid parameter override {0:?} (expected name=value)")]
    InvalidOverride(String),
    #[error("parameter {0} overridden more than once")]
    DuplicateOverride(String),
    #[error("{}: {source}", path.display())]
    Param {
        path: PathBuf,
        #[source]
        source: ParamError,
    },
}
