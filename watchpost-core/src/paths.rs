//! Deterministic per-device file layout.
//!
//! ```text
//! <home>/.watchpost/
//!   config.yaml           (immutable device configuration)
//!   state/<name>.yaml     (mutable device state, atomic writes)
//!   ledger/<name>.csv     (active append-only observation ledger)
//!   sets/<name>/<n>.csv   (immutable set archives, one per rotation)
//! ```
//!
//! Ledger and archive paths are keyed by device name so multiple device
//! identities sharing a filesystem root never collide.

use std::path::{Path, PathBuf};

use crate::types::DeviceName;

pub fn data_root(home: &Path) -> PathBuf {
    home.join(".watchpost")
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join("config.yaml")
}

pub fn state_dir(root: &Path) -> PathBuf {
    root.join("state")
}

pub fn state_path(root: &Path, name: &DeviceName) -> PathBuf {
    state_dir(root).join(format!("{}.yaml", name.0))
}

pub fn ledger_dir(root: &Path) -> PathBuf {
    root.join("ledger")
}

pub fn ledger_path(root: &Path, name: &DeviceName) -> PathBuf {
    ledger_dir(root).join(format!("{}.csv", name.0))
}

pub fn sets_dir(root: &Path, name: &DeviceName) -> PathBuf {
    root.join("sets").join(&name.0)
}

pub fn archive_path(root: &Path, name: &DeviceName, set: u32) -> PathBuf {
    sets_dir(root, name).join(format!("{set}.csv"))
}
