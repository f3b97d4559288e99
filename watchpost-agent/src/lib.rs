//! Watchpost agent runtime: the blocking poll loop.

mod error;
mod runtime;

pub use error::AgentError;
pub use runtime::{init_tracing, run_blocking, Agent};
