//! Core types for the blood-pressure ledger.
//!
//! Holds the measurement model, the error type, the pasted-text normalizer,
//! clock and timezone helpers, and the command-line settings.

pub mod error;
pub mod models;
pub mod normalizer;
pub mod settings;
pub mod time_utils;

pub use error::{LedgerError, Result};
