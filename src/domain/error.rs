//! Domain error types.
//!
//! Every engine failure is a tagged variant returned through `Result`; nothing
//! in the simulation or recommendation path panics on bad data.

use chrono::NaiveDate;

/// Top-level error type for alphatrader.
#[derive(Debug, thiserror::Error)]
pub enum AlphatraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no valid tickers or data")]
    NoTickers,

    #[error("unknown alpha: {name}")]
    UnknownAlpha { name: String },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("no strategies configured")]
    NoStrategies,

    #[error("alpha {alpha} failed: {reason}")]
    AlphaCompute { alpha: String, reason: String },

    #[error("insufficient equity data for stats: {points} point(s)")]
    InsufficientEquity { points: usize },

    #[error("equity series is entirely undefined")]
    UndefinedEquity,

    #[error("no data available before {date}")]
    NoDataBefore { date: NaiveDate },

    #[error("no ticker data available for {date}")]
    NoPricesOn { date: NaiveDate },

    #[error("could not determine best strategy from backtest results")]
    NoValidLookback,
}

impl From<&AlphatraderError> for std::process::ExitCode {
    fn from(err: &AlphatraderError) -> Self {
        let code: u8 = match err {
            AlphatraderError::Data { .. } | AlphatraderError::NoTickers => 1,
            AlphatraderError::ConfigParse { .. }
            | AlphatraderError::ConfigMissing { .. }
            | AlphatraderError::ConfigInvalid { .. } => 2,
            AlphatraderError::UnknownAlpha { .. }
            | AlphatraderError::UnknownStrategy { .. }
            | AlphatraderError::NoStrategies
            | AlphatraderError::AlphaCompute { .. } => 4,
            AlphatraderError::InsufficientEquity { .. }
            | AlphatraderError::UndefinedEquity
            | AlphatraderError::NoDataBefore { .. }
            | AlphatraderError::NoPricesOn { .. }
            | AlphatraderError::NoValidLookback => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_render_messages() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            AlphatraderError::NoDataBefore { date }.to_string(),
            "no data available before 2024-03-01"
        );
        assert_eq!(
            AlphatraderError::InsufficientEquity { points: 1 }.to_string(),
            "insufficient equity data for stats: 1 point(s)"
        );
        assert_eq!(
            AlphatraderError::NoTickers.to_string(),
            "no valid tickers or data"
        );
    }

    #[test]
    fn data_errors_exit_with_one() {
        use std::process::ExitCode;

        let data = AlphatraderError::Data {
            reason: "unreadable file".to_string(),
        };
        assert_eq!(ExitCode::from(&data), ExitCode::from(1));
        assert_eq!(ExitCode::from(&AlphatraderError::NoTickers), ExitCode::from(1));
        assert_eq!(
            ExitCode::from(&AlphatraderError::NoValidLookback),
            ExitCode::from(5)
        );
    }
}
