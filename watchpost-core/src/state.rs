//! Durable mutable device state (`<root>/state/<name>.yaml`).
//!
//! The sync client reads this once at session construction and writes the full
//! field set at the end of every poll cycle, so a crash between cycles loses
//! at most one cycle's deltas. Saves are atomic: serialize → `.tmp` sibling →
//! `rename` (same directory, same filesystem).

use std::path::Path;

use crate::error::{io_err, CoreError};
use crate::paths;
use crate::types::{DeviceName, DeviceState};

/// Load the last-saved state for `name`, or the documented defaults if no
/// state file exists yet (all booleans true except
/// `has_pending_set_while_stopped`, `current_set` = 1).
pub fn load_at(root: &Path, name: &DeviceName) -> Result<DeviceState, CoreError> {
    let path = paths::state_path(root, name);
    if !path.exists() {
        return Ok(DeviceState::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load(name: &DeviceName) -> Result<DeviceState, CoreError> {
    load_at(&crate::config::default_root()?, name)
}

/// Atomically persist the full state for `name`.
pub fn save_at(root: &Path, name: &DeviceName, state: &DeviceState) -> Result<(), CoreError> {
    let dir = paths::state_dir(root);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }
    let path = paths::state_path(root, name);
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(state)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(name: &DeviceName, state: &DeviceState) -> Result<(), CoreError> {
    save_at(&crate::config::default_root()?, name, state)
}
