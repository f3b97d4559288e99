use thiserror::Error;

/// Error surface for the agent runtime.
///
/// Anything that reaches the caller of the run loop is either a fatal startup
/// error (config/state load) or an unrecoverable local storage error; network
/// failures are absorbed inside the cycle.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("core error: {0}")]
    Core(#[from] watchpost_core::CoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] watchpost_ledger::LedgerError),

    #[error("sync error: {0}")]
    Sync(#[from] watchpost_sync::SyncError),
}
