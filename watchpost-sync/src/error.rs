//! Error types for watchpost-sync.

use thiserror::Error;

use watchpost_ledger::LedgerError;

/// All errors that can arise from sync operations.
///
/// Network-shaped variants (`Request`, `Response`) are caught inside the poll
/// cycle and downgraded to connectivity-flag updates; only local storage
/// errors (`Ledger`) propagate out of [`crate::SyncClient::run_cycle`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the ledger (append/rotate/read).
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The HTTP request itself failed: connect error, timeout, or an error
    /// status from the server. Treated as "no internet" by the state machine.
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// The response body could not be read. Treated like a request failure.
    #[error("failed to read response from {endpoint}: {source}")]
    Response {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Whether this error means the server was unreachable or misbehaving,
    /// i.e. the cycle should flip the connectivity flags and carry on.
    pub fn is_network(&self) -> bool {
        matches!(self, SyncError::Request { .. } | SyncError::Response { .. })
    }
}
