//! Aggregation and persistence layer for the blood-pressure ledger.
//!
//! Buckets canonical readings by month and slot, computes rolling-window
//! averages, persists the ledger and its views, and runs the end-to-end
//! processing pipeline.

pub mod aggregator;
pub mod pipeline;
pub mod store;

pub use ledger_core as core;
