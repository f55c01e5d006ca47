//! Cross-sectional long/short equity backtester and live recommender.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command-line composition in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
