//! Ticker universe: parsing ticker lists from configuration and loading
//! their frames through a [`DataPort`].

use crate::domain::error::AlphatraderError;
use crate::domain::frame::TickerFrame;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    LoadFailed(String),
    NoData,
}

#[derive(Debug, Clone)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct Universe {
    /// Loaded frames, in the order the tickers were requested.
    pub frames: Vec<TickerFrame>,
    pub skipped: Vec<SkippedTicker>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.frames.len()
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.ticker.as_str()).collect()
    }
}

/// Loads every ticker's rows within `[start_date, end_date]`. Tickers that
/// fail to load or have no rows are skipped; at least one must remain.
pub fn load_universe(
    data_port: &dyn DataPort,
    tickers: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Universe, AlphatraderError> {
    let mut frames = Vec::new();
    let mut skipped = Vec::new();

    for ticker in tickers {
        let frame = match data_port.fetch_frame(ticker, start_date, end_date) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping {} ({})", ticker, e);
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: SkipReason::LoadFailed(e.to_string()),
                });
                continue;
            }
        };

        if frame.is_empty() {
            warn!("Skipping {} (no data found)", ticker);
            skipped.push(SkippedTicker {
                ticker: ticker.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        info!("  {}: {} rows [OK]", ticker, frame.row_count());
        frames.push(frame);
    }

    if frames.is_empty() {
        return Err(AlphatraderError::NoTickers);
    }

    if !skipped.is_empty() {
        info!("Using {} of {} tickers", frames.len(), tickers.len());
    }

    Ok(Universe { frames, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::FrameRow;

    struct StubPort;

    impl DataPort for StubPort {
        fn fetch_frame(
            &self,
            ticker: &str,
            start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<TickerFrame, AlphatraderError> {
            match ticker {
                "BAD" => Err(AlphatraderError::Data {
                    reason: format!("no file for {ticker}"),
                }),
                "EMPTY" => Ok(TickerFrame::new(ticker.to_string(), Vec::new())),
                _ => Ok(TickerFrame::new(
                    ticker.to_string(),
                    vec![FrameRow::new(start_date, 10.0, true)],
                )),
            }
        }

        fn list_tickers(&self) -> Result<Vec<String>, AlphatraderError> {
            Ok(Vec::new())
        }

        fn get_data_range(
            &self,
            _ticker: &str,
        ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AlphatraderError> {
            Ok(None)
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    fn owned(tickers: &[&str]) -> Vec<String> {
        tickers.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_parse_tickers_basic() {
        let result = parse_tickers("AAPL,MSFT,GOOGL").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "GOOGL"]);
    }

    #[test]
    fn test_parse_tickers_whitespace_and_case() {
        let result = parse_tickers("  aapl , Msft ,nvda").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn test_parse_tickers_empty_token() {
        assert!(matches!(parse_tickers("AAPL,,MSFT"), Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_tickers_duplicate() {
        let result = parse_tickers("AAPL,MSFT,aapl");
        assert!(matches!(result, Err(UniverseError::DuplicateTicker(s)) if s == "AAPL"));
    }

    #[test]
    fn test_load_universe_skips_bad_tickers() {
        let (start, end) = range();
        let universe =
            load_universe(&StubPort, &owned(&["AAPL", "BAD", "EMPTY", "MSFT"]), start, end)
                .unwrap();
        assert_eq!(universe.tickers(), vec!["AAPL", "MSFT"]);
        assert_eq!(universe.count(), 2);
        assert_eq!(universe.skipped.len(), 2);
        assert_eq!(universe.skipped[1].reason, SkipReason::NoData);
        assert!(matches!(universe.skipped[0].reason, SkipReason::LoadFailed(_)));
    }

    #[test]
    fn test_load_universe_all_failed() {
        let (start, end) = range();
        let result = load_universe(&StubPort, &owned(&["BAD", "EMPTY"]), start, end);
        assert!(matches!(result, Err(AlphatraderError::NoTickers)));
    }
}
