//! # watchpost-ledger
//!
//! Append-only observation ledger plus set-archive rotation.
//!
//! One [`Ledger`] owns the active CSV file for a single device and the
//! numbered archives produced by [`Ledger::rotate`].

pub mod error;
pub mod ledger;

pub use error::LedgerError;
pub use ledger::Ledger;
