//! Concrete adapter implementations for ports.

pub mod column_alpha;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod price_alpha;
