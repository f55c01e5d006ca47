//! Configuration validation.
//!
//! Validates all config fields before any backtest or recommendation runs.

use crate::domain::alpha::AlphaSpec;
use crate::domain::error::AlphatraderError;
use crate::domain::strategy::StrategyDefinition;
use crate::domain::universe::parse_tickers;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_config(config: &dyn ConfigPort, today: NaiveDate) -> Result<(), AlphatraderError> {
    validate_data_config(config)?;
    validate_backtest_config(config, today)?;
    validate_strategy_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), AlphatraderError> {
    match config.get_string("data", "dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(AlphatraderError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        }),
    }
}

pub fn validate_backtest_config(
    config: &dyn ConfigPort,
    today: NaiveDate,
) -> Result<(), AlphatraderError> {
    validate_initial_capital(config)?;
    validate_dates(config, today)?;
    validate_tickers(config)?;
    Ok(())
}

/// Checks `[alphas]` and `[strategies]` together: every strategy may only
/// name alphas that are declared and parse.
pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), AlphatraderError> {
    let alphas = config.get_section("alphas");
    if alphas.is_empty() {
        return Err(AlphatraderError::ConfigMissing {
            section: "alphas".to_string(),
            key: "<any>".to_string(),
        });
    }
    let mut known = HashSet::new();
    for (name, spec) in &alphas {
        AlphaSpec::parse(name, spec)?;
        known.insert(name.as_str());
    }

    let strategies = config.get_section("strategies");
    if strategies.is_empty() {
        return Err(AlphatraderError::ConfigMissing {
            section: "strategies".to_string(),
            key: "<any>".to_string(),
        });
    }
    for (name, list) in &strategies {
        let strategy = StrategyDefinition::parse(name, list)?;
        if let Some(unknown) = strategy.alphas.iter().find(|a| !known.contains(a.as_str())) {
            return Err(AlphatraderError::ConfigInvalid {
                section: "strategies".to_string(),
                key: name.clone(),
                reason: format!("unknown alpha '{unknown}'"),
            });
        }
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), AlphatraderError> {
    let value = config.get_double("backtest", "initial_capital", 100_000.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(AlphatraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort, today: NaiveDate) -> Result<(), AlphatraderError> {
    let start_str = config.get_string("backtest", "start_date");
    let start_date = match start_str.as_deref() {
        None => {
            return Err(AlphatraderError::ConfigMissing {
                section: "backtest".to_string(),
                key: "start_date".to_string(),
            })
        }
        Some(s) => parse_date(s, "start_date")?,
    };
    let end_date = match config.get_string("backtest", "end_date") {
        None => today,
        Some(s) => parse_date(&s, "end_date")?,
    };

    if start_date >= end_date {
        return Err(AlphatraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, AlphatraderError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        AlphatraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: field.to_string(),
            reason: format!("invalid {} format, expected YYYY-MM-DD", field),
        }
    })
}

fn validate_tickers(config: &dyn ConfigPort) -> Result<(), AlphatraderError> {
    match config.get_string("backtest", "tickers") {
        Some(s) if !s.trim().is_empty() => {
            parse_tickers(&s).map_err(|e| AlphatraderError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "tickers".to_string(),
                reason: e.to_string(),
            })?;
            Ok(())
        }
        _ => Err(AlphatraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "tickers".to_string(),
        }),
    }
}
