// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading display configuration files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Display config not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error reading display config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid display config {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}
