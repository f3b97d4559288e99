//! Watchpost core library — domain types, device config/state persistence, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`CoreError`]
//! - [`config`] — load / validate the immutable device configuration
//! - [`state`] — load / save the durable mutable device state
//! - [`paths`] — deterministic per-device file layout

pub mod config;
pub mod error;
pub mod paths;
pub mod state;
pub mod types;

pub use error::CoreError;
pub use types::{DeviceConfig, DeviceName, DeviceSession, DeviceState, ObservationRecord};
