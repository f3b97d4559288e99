//! `watchpost run` — foreground agent loop.

use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};

use watchpost_agent::{init_tracing, run_blocking};
use watchpost_core::config;

pub fn run() -> Result<()> {
    init_tracing();
    let root = config::default_root().context("could not determine data root")?;

    // The loop is only left on a fatal error; process termination between
    // cycles is the normal shutdown path and is safe by design.
    let shutdown = AtomicBool::new(false);
    run_blocking(&root, &shutdown).context("agent exited with error")
}
