//! Error types for watchpost-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from config and state persistence.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.watchpost/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No device configuration exists yet; `watchpost init` must run first.
    #[error("device configuration not found at {path}; run `watchpost init` first")]
    ConfigNotFound { path: PathBuf },

    /// A required configuration field is missing or out of range. Fatal at
    /// startup, before the poll loop is entered.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Convenience constructor for [`CoreError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
