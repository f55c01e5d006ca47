//! Cross-sectional signal construction.
//!
//! For each date: collect every alpha's values over the eligible tickers,
//! z-score them across the cross-section, sum the z-scores of tickers present
//! in every alpha, rank ascending and cut the bottom and top quartiles into
//! SHORT and LONG buckets.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::domain::alpha::AlphaColumn;
use crate::domain::frame::TickerFrame;
use crate::domain::stats::{mean, population_std};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Short = -1,
    Neutral = 0,
    Long = 1,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    pub fn label(self) -> &'static str {
        match self {
            Signal::Short => "SHORT",
            Signal::Neutral => "NEUTRAL",
            Signal::Long => "LONG",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedTicker {
    pub ticker: String,
    pub composite: f64,
    pub signal: Signal,
}

/// Signals for one date, ordered by ascending composite alpha.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSet {
    pub ranked: Vec<RankedTicker>,
}

impl SignalSet {
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn signal(&self, ticker: &str) -> Option<Signal> {
        self.ranked
            .iter()
            .find(|r| r.ticker == ticker)
            .map(|r| r.signal)
    }

    pub fn composite(&self, ticker: &str) -> Option<f64> {
        self.ranked
            .iter()
            .find(|r| r.ticker == ticker)
            .map(|r| r.composite)
    }

    pub fn tickers_with(&self, signal: Signal) -> Vec<&str> {
        self.ranked
            .iter()
            .filter(|r| r.signal == signal)
            .map(|r| r.ticker.as_str())
            .collect()
    }

    pub fn long_tickers(&self) -> Vec<&str> {
        self.tickers_with(Signal::Long)
    }

    pub fn short_tickers(&self) -> Vec<&str> {
        self.tickers_with(Signal::Short)
    }

    pub fn to_map(&self) -> HashMap<String, Signal> {
        self.ranked
            .iter()
            .map(|r| (r.ticker.clone(), r.signal))
            .collect()
    }
}

/// One alpha's standardized cross-section. `scores` holds exactly the tickers
/// that were present for this alpha on the date.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedAlpha {
    pub name: String,
    pub scores: HashMap<String, f64>,
}

impl StandardizedAlpha {
    pub fn contains(&self, ticker: &str) -> bool {
        self.scores.contains_key(ticker)
    }
}

/// Raw values of `alpha` for tickers eligible on `date`, in universe order.
/// A missing or NaN value for an eligible ticker counts as 0.
pub fn collect_eligible_values(
    frames: &[TickerFrame],
    alpha: &AlphaColumn,
    date: NaiveDate,
) -> Vec<(String, f64)> {
    frames
        .iter()
        .filter(|frame| frame.is_eligible(date))
        .map(|frame| {
            let value = alpha
                .value(&frame.ticker, date)
                .filter(|v| !v.is_nan())
                .unwrap_or(0.0);
            (frame.ticker.clone(), value)
        })
        .collect()
}

/// `(x - mean) / std` across the cross-section; all zeros when `std == 0`.
pub fn standardize(name: &str, values: &[(String, f64)]) -> StandardizedAlpha {
    let raw: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
    let m = mean(&raw);
    let std = population_std(&raw);

    let scores = values
        .iter()
        .map(|(ticker, v)| {
            let z = if std > 0.0 { (v - m) / std } else { 0.0 };
            (ticker.clone(), z)
        })
        .collect();

    StandardizedAlpha {
        name: name.to_string(),
        scores,
    }
}

/// Sum of standardized scores for tickers present in every alpha, in universe
/// order. With no standardized alpha every ticker is present and scores 0.
pub fn composite_scores(
    universe: &[&str],
    standardized: &[StandardizedAlpha],
) -> Vec<(String, f64)> {
    let present: HashSet<&str> = universe
        .iter()
        .copied()
        .filter(|t| standardized.iter().all(|alpha| alpha.contains(t)))
        .collect();

    universe
        .iter()
        .filter(|t| present.contains(*t))
        .map(|t| {
            let score: f64 = standardized.iter().map(|alpha| alpha.scores[*t]).sum();
            (t.to_string(), score)
        })
        .collect()
}

/// Size of each of the long and short buckets.
pub fn bucket_size(n: usize) -> usize {
    (n / 4).max(1)
}

/// Ranks `composite` ascending (stable, so equal scores keep universe order)
/// and assigns SHORT to the bottom bucket and LONG to the top bucket. When the
/// buckets overlap, LONG wins.
pub fn assign_signals(mut composite: Vec<(String, f64)>) -> SignalSet {
    composite.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let n = composite.len();
    let count = bucket_size(n);

    let ranked = composite
        .into_iter()
        .enumerate()
        .map(|(i, (ticker, score))| {
            let signal = if i + count >= n {
                Signal::Long
            } else if i < count {
                Signal::Short
            } else {
                Signal::Neutral
            };
            RankedTicker {
                ticker,
                composite: score,
                signal,
            }
        })
        .collect();

    SignalSet { ranked }
}

pub struct SignalGenerator<'a> {
    frames: &'a [TickerFrame],
    alphas: &'a [&'a AlphaColumn],
}

impl<'a> SignalGenerator<'a> {
    pub fn new(frames: &'a [TickerFrame], alphas: &'a [&'a AlphaColumn]) -> Self {
        Self { frames, alphas }
    }

    /// Discrete signal per ranked ticker on `date`.
    pub fn generate_signals(&self, date: NaiveDate) -> HashMap<String, Signal> {
        self.generate_ranked(date).to_map()
    }

    /// Signals together with each ticker's composite alpha.
    pub fn generate_ranked(&self, date: NaiveDate) -> SignalSet {
        let standardized: Vec<StandardizedAlpha> = self
            .alphas
            .iter()
            .filter_map(|alpha| {
                let values = collect_eligible_values(self.frames, alpha, date);
                if values.is_empty() {
                    None
                } else {
                    Some(standardize(&alpha.name, &values))
                }
            })
            .collect();

        let universe: Vec<&str> = self.frames.iter().map(|f| f.ticker.as_str()).collect();
        assign_signals(composite_scores(&universe, &standardized))
    }
}
