//! # watchpost-sync
//!
//! The device synchronization state machine.
//!
//! [`SyncClient::run_cycle`] executes one poll cycle against a [`ServerApi`]
//! implementation: sample / append while recording, post to the server and
//! apply its directives, attempt check-in while unchecked, poll for a resume
//! directive while stopped. Network failures never escape a cycle; they are
//! downgraded to connectivity-flag updates and retried with capped
//! exponential backoff.

pub mod backoff;
pub mod cycle;
pub mod directive;
pub mod error;
pub mod motion;
pub mod server;

pub use backoff::Backoff;
pub use cycle::SyncClient;
pub use directive::{parse_directives, Directive, DirectiveSet};
pub use error::SyncError;
pub use motion::{MotionSource, RandomMotion, ScriptedMotion};
pub use server::{CheckInOutcome, HttpServer, ServerApi};
