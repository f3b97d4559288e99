//! Immutable device configuration (`<root>/config.yaml`).
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(root: &Path, …)` — explicit data root; used in tests with `TempDir`
//! - `fn(…)` — derives the root from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.
//!
//! A missing or invalid config is a fatal startup error: the caller exits
//! non-zero before the poll loop runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{io_err, CoreError};
use crate::paths;
use crate::types::DeviceConfig;

/// Minimum accepted shared-password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Load and validate the device configuration rooted at `root`.
pub fn load_at(root: &Path) -> Result<DeviceConfig, CoreError> {
    let path = paths::config_path(root);
    if !path.exists() {
        return Err(CoreError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let config: DeviceConfig =
        serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })?;
    validate(&config)?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<DeviceConfig, CoreError> {
    load_at(&default_root()?)
}

/// Atomically save the device configuration rooted at `root`.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `rename`.
pub fn save_at(root: &Path, config: &DeviceConfig) -> Result<(), CoreError> {
    validate(config)?;
    if !root.exists() {
        std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
    }
    let path = paths::config_path(root);
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &DeviceConfig) -> Result<(), CoreError> {
    save_at(&default_root()?, config)
}

/// Whether a configuration file already exists under `root`.
pub fn exists_at(root: &Path) -> bool {
    paths::config_path(root).exists()
}

/// Validate the required fields. Returns the first violation found.
pub fn validate(config: &DeviceConfig) -> Result<(), CoreError> {
    if config.name.0.trim().is_empty() {
        return Err(invalid("device name must not be empty"));
    }
    if config.host.trim().is_empty() {
        return Err(invalid("server host must not be empty"));
    }
    if config.password.len() < MIN_PASSWORD_LEN {
        return Err(invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if !config.poll_interval_secs.is_finite() || config.poll_interval_secs < 0.0 {
        return Err(invalid("poll interval must be a non-negative number of seconds"));
    }
    if Duration::try_from_secs_f64(config.poll_interval_secs).is_err() {
        return Err(invalid("poll interval is too large"));
    }
    Ok(())
}

/// `<home>/.watchpost/` via `dirs::home_dir()`.
pub fn default_root() -> Result<PathBuf, CoreError> {
    let home = dirs::home_dir().ok_or(CoreError::HomeNotFound)?;
    Ok(paths::data_root(&home))
}

fn invalid(reason: impl Into<String>) -> CoreError {
    CoreError::InvalidConfig {
        reason: reason.into(),
    }
}
