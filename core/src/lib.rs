//! qvi-core: chips category trial analysis.
//!
//! Cleans raw transactions, aggregates monthly store metrics, selects a
//! matched control store for every trial store and tests whether the
//! trial moved sales, customers or purchase frequency.

pub mod cleaning;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod loader;
pub mod metrics;
pub mod month;
pub mod record;
pub mod report;
pub mod rng;
pub mod segments;
pub mod selector;
pub mod stats;
pub mod store;
pub mod synth;
pub mod types;
