//! Core domain types and logic.

pub mod alpha;
pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod portfolio;
pub mod recommendation;
pub mod signal;
pub mod stats;
pub mod strategy;
pub mod universe;
