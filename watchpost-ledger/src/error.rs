//! Error types for watchpost-ledger.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`LedgerError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.into(),
        source,
    }
}
