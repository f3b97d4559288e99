//! `watchpost init` — non-interactive first-run setup.

use anyhow::{bail, Context, Result};
use clap::Args;

use watchpost_core::types::{DeviceConfig, DeviceName, DeviceState};
use watchpost_core::{config, state};
use watchpost_ledger::Ledger;

/// Arguments for `watchpost init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Device name; must be unique across the fleet.
    #[arg(long)]
    pub name: String,

    /// Collection server host.
    #[arg(long)]
    pub host: String,

    /// Collection server port.
    #[arg(long, default_value_t = 8003)]
    pub port: u16,

    /// Shared server password (at least 6 characters).
    #[arg(long)]
    pub password: String,

    /// Talk to the server over HTTPS.
    #[arg(long)]
    pub https: bool,

    /// Seconds between poll cycles.
    #[arg(long, default_value_t = 2.0)]
    pub interval: f64,

    /// Overwrite an existing configuration.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let root = config::default_root().context("could not determine data root")?;

        if config::exists_at(&root) && !self.force {
            bail!(
                "configuration already exists at {}; pass --force to overwrite",
                root.join("config.yaml").display()
            );
        }

        let device_config = DeviceConfig {
            name: DeviceName::from(self.name),
            host: self.host,
            port: self.port,
            https: self.https,
            password: self.password,
            poll_interval_secs: self.interval,
        };

        config::save_at(&root, &device_config).context("failed to write configuration")?;
        state::save_at(&root, &device_config.name, &DeviceState::default())
            .context("failed to seed device state")?;
        Ledger::open(&root, device_config.name.clone())
            .context("failed to create ledger file")?;

        println!(
            "✓ initialized device '{}' at {}",
            device_config.name,
            root.display()
        );
        println!("  server: {}", device_config.base_url());
        Ok(())
    }
}
