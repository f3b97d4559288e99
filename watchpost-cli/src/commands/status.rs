//! `watchpost status` — persisted device state and ledger summary.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use watchpost_core::{config, state};
use watchpost_ledger::Ledger;

/// Arguments for `watchpost status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let root = config::default_root().context("could not determine data root")?;
        let device_config = config::load_at(&root).context("failed to load configuration")?;
        let device_state =
            state::load_at(&root, &device_config.name).context("failed to load device state")?;
        let ledger = Ledger::open(&root, device_config.name.clone())
            .context("failed to open ledger")?;
        let observations = ledger.len().context("failed to read ledger")?;
        let archived = ledger.archived_sets().context("failed to list archives")?;

        if self.json {
            let payload = json!({
                "device": device_config.name.to_string(),
                "server": device_config.base_url(),
                "poll_interval_secs": device_config.poll_interval_secs,
                "is_recording": device_state.is_recording,
                "is_checked_in": device_state.is_checked_in,
                "has_internet": device_state.has_internet,
                "had_internet_before": device_state.had_internet_before,
                "has_pending_set_while_stopped": device_state.has_pending_set_while_stopped,
                "current_set": device_state.current_set,
                "active_observations": observations,
                "archived_sets": archived,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to render status JSON")?
            );
            return Ok(());
        }

        println!("device        {}", device_config.name);
        println!("server        {}", device_config.base_url());
        println!("recording     {}", device_state.is_recording);
        println!("checked in    {}", device_state.is_checked_in);
        println!("internet      {}", device_state.has_internet);
        println!("current set   {}", device_state.current_set);
        println!("observations  {observations}");
        println!("archived sets {}", archived.len());
        Ok(())
    }
}
