//! Plain-text report layer for the blood-pressure ledger.
//!
//! Renders the result of a processing run: a header, display-width aware
//! tables of readings, and per-window averages with their chart titles.

pub mod header;
pub mod summary;
pub mod table;

pub use ledger_core as core;
