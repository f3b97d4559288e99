//! `watchpost wipe` — delete a device's local ledger, archives, and state.
//!
//! Intended for test rigs, not production devices. The device configuration
//! itself is kept so the identity survives a wipe.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use watchpost_core::types::DeviceName;
use watchpost_core::{config, paths};

/// Arguments for `watchpost wipe`.
#[derive(Args, Debug)]
pub struct WipeArgs {
    /// Skip the interactive confirmation.
    #[arg(long)]
    pub yes: bool,
}

impl WipeArgs {
    pub fn run(self) -> Result<()> {
        let root = config::default_root().context("could not determine data root")?;
        let device_config = config::load_at(&root).context("failed to load configuration")?;

        if !self.yes {
            print!(
                "You are about to delete all recorded data for '{}'. Continue? (y/N) ",
                device_config.name
            );
            std::io::stdout().flush().context("flush prompt")?;
            let mut answer = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut answer)
                .context("read confirmation")?;
            if !matches!(answer.trim(), "y" | "Y") {
                println!("Nothing was deleted");
                return Ok(());
            }
        }

        let removed = wipe_at(&root, &device_config.name)?;
        if removed.is_empty() {
            println!("Nothing to delete for '{}'", device_config.name);
        } else {
            println!("Client wiped:");
            for path in removed {
                println!("  {}", path.display());
            }
        }
        Ok(())
    }
}

/// Delete the ledger file, set archives, and state file for `name` under
/// `root`. Refuses to touch a protected root. Returns the paths removed.
pub fn wipe_at(root: &Path, name: &DeviceName) -> Result<Vec<PathBuf>> {
    if is_protected_root(root) {
        bail!(
            "refusing to wipe {}: resolves to a protected directory",
            root.display()
        );
    }

    let mut removed = Vec::new();

    let ledger = paths::ledger_path(root, name);
    if ledger.exists() {
        std::fs::remove_file(&ledger)
            .with_context(|| format!("failed to remove {}", ledger.display()))?;
        removed.push(ledger);
    }

    let sets = paths::sets_dir(root, name);
    if sets.exists() {
        std::fs::remove_dir_all(&sets)
            .with_context(|| format!("failed to remove {}", sets.display()))?;
        removed.push(sets);
    }

    let state = paths::state_path(root, name);
    if state.exists() {
        std::fs::remove_file(&state)
            .with_context(|| format!("failed to remove {}", state.display()))?;
        removed.push(state);
    }

    Ok(removed)
}

/// A wipe target is protected when it resolves to the filesystem root or to
/// the user's home directory itself (rather than a directory inside it).
fn is_protected_root(root: &Path) -> bool {
    let resolved = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    if resolved.parent().is_none() {
        return true;
    }
    match dirs::home_dir() {
        Some(home) => {
            let home = std::fs::canonicalize(&home).unwrap_or(home);
            resolved == home
        }
        None => false,
    }
}
