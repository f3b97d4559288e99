//! The poll loop: sleep → cycle → persist.
//!
//! Single-threaded by design: one cycle executes fully before the next
//! begins, the interval sleep is the only suspension point, and network calls
//! inside the cycle carry bounded timeouts. The full session state is flushed
//! after every cycle, so killing the process between cycles loses at most the
//! in-flight cycle's deltas.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use watchpost_core::types::DeviceSession;
use watchpost_core::{config, state};
use watchpost_ledger::Ledger;
use watchpost_sync::backoff::DEFAULT_CAP;
use watchpost_sync::{Backoff, HttpServer, MotionSource, RandomMotion, ServerApi, SyncClient};

use crate::error::AgentError;

/// One device's running agent: session, ledger, sync client, motion source.
pub struct Agent<S, M> {
    root: PathBuf,
    session: DeviceSession,
    ledger: Ledger,
    client: SyncClient<S>,
    motion: M,
}

impl<S: ServerApi, M: MotionSource> Agent<S, M> {
    /// Assemble an agent from an already-loaded session. `root` is the data
    /// root the ledger and state files live under.
    pub fn new(
        root: &Path,
        session: DeviceSession,
        client: SyncClient<S>,
        motion: M,
    ) -> Result<Self, AgentError> {
        let ledger = Ledger::open(root, session.name().clone())?;
        Ok(Self {
            root: root.to_path_buf(),
            session,
            ledger,
            client,
            motion,
        })
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// One cycle plus the unconditional end-of-cycle state flush. A failed
    /// flush is an unrecoverable local storage error and propagates.
    pub fn step(&mut self) -> Result<(), AgentError> {
        let result = self
            .client
            .run_cycle(&mut self.session, &self.ledger, &mut self.motion);
        // Flush even when the cycle failed: the flags it mutated before the
        // failure must survive a restart.
        state::save_at(&self.root, self.session.name(), &self.session.state)?;
        result?;
        Ok(())
    }

    /// Sleep-then-step until `shutdown` flips true. Checked once per cycle,
    /// so shutdown takes effect between cycles, never inside one.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), AgentError> {
        let interval = self.session.config.poll_interval();
        tracing::info!(
            device = %self.session.name(),
            interval_secs = interval.as_secs_f64(),
            "agent loop starting",
        );

        while !shutdown.load(Ordering::Relaxed) {
            std::thread::sleep(interval);
            self.step()?;
        }

        tracing::info!(device = %self.session.name(), "agent loop stopped");
        Ok(())
    }
}

/// Load config and persisted state from `root`, then run the agent loop with
/// the production HTTP client and motion stub until `shutdown` flips true.
///
/// Configuration errors surface here, before the loop is entered.
pub fn run_blocking(root: &Path, shutdown: &AtomicBool) -> Result<(), AgentError> {
    let config = config::load_at(root)?;
    let device_state = state::load_at(root, &config.name)?;
    let interval = config.poll_interval();

    let server = HttpServer::new(config.base_url(), interval);
    let backoff = Backoff::new(interval.max(std::time::Duration::from_secs(1)), DEFAULT_CAP);
    let session = DeviceSession::new(config, device_state);

    let mut agent = Agent::new(root, session, SyncClient::new(server, backoff), RandomMotion)?;
    agent.run(shutdown)
}

/// Install the tracing subscriber (env-filter, default `info`).
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
