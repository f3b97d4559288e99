//! Domain types for a Watchpost device.
//!
//! Booleans are real booleans everywhere in memory; serialization happens only
//! at the persistence boundary (`config` / `state` modules).

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed device name, unique per fleet, immutable after setup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceName(pub String);

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DeviceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Configuration (immutable after first-run setup)
// ---------------------------------------------------------------------------

/// Immutable device identity and network settings, from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: DeviceName,
    pub host: String,
    pub port: u16,
    /// Use HTTPS transport when talking to the collection server.
    #[serde(default)]
    pub https: bool,
    pub password: String,
    /// Seconds between poll cycles. Also used as the network timeout.
    pub poll_interval_secs: f64,
}

impl DeviceConfig {
    /// `http(s)://host:port` — base URL for every server endpoint.
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// Total: values `Duration` cannot represent (negative, NaN, infinite, or
    /// past the u64-seconds range) collapse to zero. `config::validate`
    /// rejects such intervals before a session is built.
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_secs).unwrap_or(Duration::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Durable mutable state
// ---------------------------------------------------------------------------

/// The device flags that must survive a process restart, from `state/<name>.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub is_recording: bool,
    pub is_checked_in: bool,
    pub has_internet: bool,
    pub had_internet_before: bool,
    /// Set while stopped after a `New Set` directive, so repeated status polls
    /// don't rotate the ledger again. True only while not recording.
    pub has_pending_set_while_stopped: bool,
    /// Monotonically non-decreasing archive counter, starting at 1.
    pub current_set: u32,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            is_recording: true,
            is_checked_in: true,
            has_internet: true,
            had_internet_before: true,
            has_pending_set_while_stopped: false,
            current_set: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One device's identity plus its current runtime state.
///
/// Constructed once at process start from the persisted config and state,
/// mutated in place each poll cycle, flushed back at the end of every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSession {
    pub config: DeviceConfig,
    pub state: DeviceState,
}

impl DeviceSession {
    pub fn new(config: DeviceConfig, state: DeviceState) -> Self {
        Self { config, state }
    }

    pub fn name(&self) -> &DeviceName {
        &self.config.name
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// One detected-motion event. Ledger line format: `date,time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationRecord {
    pub device: DeviceName,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
}

impl ObservationRecord {
    /// Build a record stamped with the given local wall-clock instant.
    pub fn at(device: DeviceName, when: DateTime<Local>) -> Self {
        Self {
            device,
            date: when.format("%Y-%m-%d").to_string(),
            time: when.format("%H:%M:%S").to_string(),
        }
    }

    /// Build a record stamped "now".
    pub fn now(device: DeviceName) -> Self {
        Self::at(device, Local::now())
    }

    /// `name,date,time,movement` — the sensor-handler timestamp payload.
    pub fn sensor_payload(&self, movement: bool) -> String {
        format!(
            "{},{},{},{}",
            self.device,
            self.date,
            self.time,
            if movement { 1 } else { 0 }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
