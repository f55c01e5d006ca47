//! CSV file data adapter.
//!
//! One file per ticker, `<base_path>/<TICKER>.csv`, with a header row. `date`
//! and `close` are required; `eligible` is optional and every other column is
//! read as a numeric alpha column.

use crate::domain::error::AlphatraderError;
use crate::domain::frame::{FrameRow, TickerFrame};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const DATE_COLUMN: &str = "date";
const CLOSE_COLUMN: &str = "close";
const ELIGIBLE_COLUMN: &str = "eligible";

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Layout {
    date: usize,
    close: usize,
    eligible: Option<usize>,
    /// `(index, name)` of every other column.
    columns: Vec<(usize, String)>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord, path: &str) -> Result<Self, AlphatraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let missing = |name: &str| AlphatraderError::Data {
            reason: format!("{path}: missing {name} column"),
        };

        let date = find(DATE_COLUMN).ok_or_else(|| missing(DATE_COLUMN))?;
        let close = find(CLOSE_COLUMN).ok_or_else(|| missing(CLOSE_COLUMN))?;
        let eligible = find(ELIGIBLE_COLUMN);
        let columns = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date && *i != close && Some(*i) != eligible)
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();

        Ok(Self {
            date,
            close,
            eligible,
            columns,
        })
    }
}

fn parse_eligible(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "" => None,
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    fn read_rows(
        &self,
        ticker: &str,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<FrameRow>, AlphatraderError> {
        let path = self.csv_path(ticker);
        let display = path.display().to_string();
        let content = fs::read_to_string(&path).map_err(|e| AlphatraderError::Data {
            reason: format!("failed to read {}: {}", display, e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| AlphatraderError::Data {
                reason: format!("CSV parse error in {}: {}", display, e),
            })?
            .clone();
        let layout = Layout::from_headers(&headers, &display)?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| AlphatraderError::Data {
                reason: format!("CSV parse error in {}: {}", display, e),
            })?;

            let date_str = record.get(layout.date).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                AlphatraderError::Data {
                    reason: format!("invalid date '{}' in {}: {}", date_str, display, e),
                }
            })?;

            if let Some((start, end)) = range {
                if date < start || date > end {
                    continue;
                }
            }

            let close_str = record.get(layout.close).unwrap_or_default().trim();
            let close = if close_str.is_empty() {
                f64::NAN
            } else {
                close_str.parse::<f64>().map_err(|e| AlphatraderError::Data {
                    reason: format!("invalid close value '{}' in {}: {}", close_str, display, e),
                })?
            };

            let eligible = layout
                .eligible
                .and_then(|i| record.get(i))
                .and_then(parse_eligible)
                .unwrap_or(true);

            let mut row = FrameRow::new(date, close, eligible);
            for (i, name) in &layout.columns {
                if let Some(value) = record.get(*i).and_then(|v| v.trim().parse::<f64>().ok()) {
                    row.columns.insert(name.clone(), value);
                }
            }
            rows.push(row);
        }

        Ok(rows)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_frame(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TickerFrame, AlphatraderError> {
        let rows = self.read_rows(ticker, Some((start_date, end_date)))?;
        Ok(TickerFrame::new(ticker.to_string(), rows))
    }

    fn list_tickers(&self) -> Result<Vec<String>, AlphatraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AlphatraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| AlphatraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }

    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AlphatraderError> {
        if !self.csv_path(ticker).exists() {
            return Ok(None);
        }
        let frame = TickerFrame::new(ticker.to_string(), self.read_rows(ticker, None)?);
        Ok(frame
            .first_date()
            .zip(frame.last_date())
            .map(|(first, last)| (first, last, frame.row_count())))
    }
}
