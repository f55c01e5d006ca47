#![allow(dead_code)]

use alphatrader::domain::alpha::AlphaColumn;
use alphatrader::domain::backtest::BacktestConfig;
use alphatrader::domain::error::AlphatraderError;
pub use alphatrader::domain::frame::{FrameRow, TickerFrame};
use alphatrader::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<FrameRow>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_rows(mut self, ticker: &str, rows: Vec<FrameRow>) -> Self {
        self.data.insert(ticker.to_string(), rows);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_frame(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TickerFrame, AlphatraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(AlphatraderError::Data {
                reason: reason.clone(),
            });
        }
        let rows = self
            .data
            .get(ticker)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.date >= start_date && r.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(TickerFrame::new(ticker.to_string(), rows))
    }

    fn list_tickers(&self) -> Result<Vec<String>, AlphatraderError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }

    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AlphatraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(AlphatraderError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(ticker) {
            Some(rows) if !rows.is_empty() => {
                let min = rows.iter().map(|r| r.date).min().unwrap();
                let max = rows.iter().map(|r| r.date).max().unwrap();
                Ok(Some((min, max, rows.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_row(date_str: &str, close: f64) -> FrameRow {
    FrameRow::new(
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        close,
        true,
    )
}

pub fn make_frame(ticker: &str, rows: &[(&str, f64)]) -> TickerFrame {
    TickerFrame::new(
        ticker.to_string(),
        rows.iter().map(|(d, c)| make_row(d, *c)).collect(),
    )
}

/// Daily rows from `start_date`, price moving by `step` each day.
pub fn generate_rows(start_date: &str, count: usize, start_price: f64, step: f64) -> Vec<FrameRow> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            FrameRow::new(
                start + chrono::Duration::days(i as i64),
                start_price + step * i as f64,
                true,
            )
        })
        .collect()
}

pub fn generate_frame(
    ticker: &str,
    start_date: &str,
    count: usize,
    start_price: f64,
    step: f64,
) -> TickerFrame {
    TickerFrame::new(
        ticker.to_string(),
        generate_rows(start_date, count, start_price, step),
    )
}

/// Alpha with the same per-ticker value on every date of each frame.
pub fn constant_alpha(name: &str, frames: &[TickerFrame], values: &[(&str, f64)]) -> AlphaColumn {
    let mut alpha = AlphaColumn::new(name);
    for frame in frames {
        if let Some((_, v)) = values.iter().find(|(t, _)| *t == frame.ticker) {
            for row in &frame.rows {
                alpha.insert(&frame.ticker, row.date, *v);
            }
        }
    }
    alpha
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        initial_capital: 100_000.0,
    }
}
