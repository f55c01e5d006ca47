//! Per-ticker time series frames and the unified trading timeline.
//!
//! Frames are owned by the data provider and are read-only to the engine, so a
//! single `&[TickerFrame]` is shared by every simulation of a run.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One dated row of a ticker frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub date: NaiveDate,
    pub close: f64,
    pub eligible: bool,
    /// Precomputed numeric columns keyed by header name.
    pub columns: BTreeMap<String, f64>,
}

impl FrameRow {
    pub fn new(date: NaiveDate, close: f64, eligible: bool) -> Self {
        Self {
            date,
            close,
            eligible,
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, name: &str, value: f64) -> Self {
        self.columns.insert(name.to_string(), value);
        self
    }
}

#[derive(Debug, Clone)]
pub struct TickerFrame {
    pub ticker: String,
    pub rows: Vec<FrameRow>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl TickerFrame {
    /// Builds a frame, sorting rows by date. A duplicated date keeps its last row.
    pub fn new(ticker: String, mut rows: Vec<FrameRow>) -> Self {
        rows.sort_by_key(|r| r.date);
        rows.dedup_by(|later, earlier| {
            if later.date == earlier.date {
                std::mem::swap(later, earlier);
                true
            } else {
                false
            }
        });
        let date_index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.date, i))
            .collect();
        Self {
            ticker,
            rows,
            date_index,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get_row(&self, date: NaiveDate) -> Option<&FrameRow> {
        self.date_index.get(&date).map(|&i| &self.rows[i])
    }

    pub fn has_date(&self, date: NaiveDate) -> bool {
        self.date_index.contains_key(&date)
    }

    /// Close on `date`, if the frame has a row for it. The value may be NaN.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.get_row(date).map(|row| row.close)
    }

    pub fn is_eligible(&self, date: NaiveDate) -> bool {
        self.get_row(date).is_some_and(|row| row.eligible)
    }

    /// The last `max_rows` rows dated on or before `date`.
    pub fn history_through(&self, date: NaiveDate, max_rows: usize) -> &[FrameRow] {
        let end = self.rows.partition_point(|row| row.date <= date);
        let start = end.saturating_sub(max_rows);
        &self.rows[start..end]
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }
}

/// Sorted union of every date present in any frame.
pub fn build_unified_timeline(frames: &[TickerFrame]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = frames
        .iter()
        .flat_map(|frame| frame.rows.iter().map(|row| row.date))
        .collect();
    unique_dates.into_iter().collect()
}

/// Timeline dates within `[start, end]`, inclusive.
pub fn trade_range(timeline: &[NaiveDate], start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    timeline
        .iter()
        .copied()
        .filter(|d| *d >= start && *d <= end)
        .collect()
}

/// Ticker → close for every frame with a row on `date`.
pub fn price_map(frames: &[TickerFrame], date: NaiveDate) -> HashMap<String, f64> {
    frames
        .iter()
        .filter_map(|frame| frame.close_on(date).map(|c| (frame.ticker.clone(), c)))
        .collect()
}
