//! Live recommendations from trailing lookback-window backtests.
//!
//! Each window is re-backtested independently up to the reference day and
//! only used to pick a label and a Sharpe ratio. The positions themselves come
//! from a fresh signal pass at the reference day, sized by alpha strength and
//! inverse trailing volatility.

use chrono::{Duration, NaiveDate};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

use super::alpha::AlphaColumn;
use super::backtest::{run_backtest, BacktestConfig};
use super::error::AlphatraderError;
use super::frame::{build_unified_timeline, price_map, TickerFrame};
use super::signal::{RankedTicker, Signal, SignalGenerator};
use super::stats::{pct_changes, sample_std};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    pub label: &'static str,
    pub days: i64,
}

/// Declaration order is the tie-break order for best-window selection.
pub const LOOKBACK_WINDOWS: [LookbackWindow; 3] = [
    LookbackWindow {
        label: "1_month",
        days: 30,
    },
    LookbackWindow {
        label: "6_months",
        days: 180,
    },
    LookbackWindow {
        label: "2_years",
        days: 730,
    },
];

pub const DEFAULT_VOLATILITY: f64 = 0.02;
const VOLATILITY_FLOOR: f64 = 0.005;
const VOLATILITY_ROWS: usize = 30;
const MIN_VOLATILITY_ROWS: usize = 6;
const MIN_ALPHA_SCALE: f64 = 0.001;
/// Share of equity given to each non-empty side.
const SIDE_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionRecommendation {
    pub ticker: String,
    pub position: Side,
    pub units: i64,
    pub price: f64,
    pub capital_allocation: f64,
    /// Percent of total equity.
    pub allocation_percentage: f64,
    /// Raw composite alpha at the reference day.
    pub alpha_strength: f64,
    /// `|composite| / max |composite|` within the side.
    pub strength_weight: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowOutcome {
    pub label: &'static str,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub best_period: &'static str,
    pub strategy: String,
    pub date: NaiveDate,
    pub reference_date: NaiveDate,
    pub sharpe_ratio: f64,
    /// Percent of the ticker universe with neither a LONG nor a SHORT signal.
    /// Not a dollar cash share of the book.
    pub cash_position: f64,
    pub long_tickers: Vec<String>,
    pub short_tickers: Vec<String>,
    pub positions: Vec<PositionRecommendation>,
    pub windows: Vec<WindowOutcome>,
}

pub struct RecommendationEngine<'a> {
    frames: &'a [TickerFrame],
    alphas: &'a [&'a AlphaColumn],
    config: &'a BacktestConfig,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(
        frames: &'a [TickerFrame],
        alphas: &'a [&'a AlphaColumn],
        config: &'a BacktestConfig,
    ) -> Self {
        Self {
            frames,
            alphas,
            config,
        }
    }

    /// Alpha names joined with `", "`.
    pub fn strategy_label(&self) -> String {
        self.alphas
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Recommendation for `target` (today when `None`), based on the last
    /// trading day strictly before it.
    pub fn trade_indicator(
        &self,
        target: Option<NaiveDate>,
    ) -> Result<Recommendation, AlphatraderError> {
        if self.frames.is_empty() {
            return Err(AlphatraderError::NoTickers);
        }
        let target = target.unwrap_or_else(|| chrono::Local::now().date_naive());

        let timeline = build_unified_timeline(self.frames);
        let reference = reference_day(&timeline, target)
            .ok_or(AlphatraderError::NoDataBefore { date: target })?;
        info!("Using {} as the reference day", reference);

        let prices = price_map(self.frames, reference);
        if prices.is_empty() {
            return Err(AlphatraderError::NoPricesOn { date: reference });
        }

        let windows: Vec<WindowOutcome> = LOOKBACK_WINDOWS
            .par_iter()
            .map(|window| {
                evaluate_window(self.frames, self.alphas, self.config, *window, reference)
            })
            .collect();
        for outcome in windows.iter().filter(|w| w.error.is_some()) {
            warn!(
                "Lookback window {} skipped: {}",
                outcome.label,
                outcome.error.as_deref().unwrap_or_default()
            );
        }

        let (best_period, sharpe_ratio) =
            select_best(&windows).ok_or(AlphatraderError::NoValidLookback)?;

        let signals = SignalGenerator::new(self.frames, self.alphas).generate_ranked(reference);
        let longs: Vec<&RankedTicker> = signals
            .ranked
            .iter()
            .filter(|r| r.signal == Signal::Long)
            .collect();
        let shorts: Vec<&RankedTicker> = signals
            .ranked
            .iter()
            .filter(|r| r.signal == Signal::Short)
            .collect();

        let volatilities: HashMap<&str, f64> = self
            .frames
            .iter()
            .map(|f| (f.ticker.as_str(), trailing_volatility(f, reference)))
            .collect();

        let equity = self.config.initial_capital;
        let mut positions = size_side(Side::Long, &longs, &volatilities, &prices, equity);
        positions.extend(size_side(Side::Short, &shorts, &volatilities, &prices, equity));

        let universe = self.frames.len();
        let neutral = universe - longs.len() - shorts.len();
        let cash_position = neutral as f64 / universe as f64 * 100.0;

        Ok(Recommendation {
            best_period,
            strategy: self.strategy_label(),
            date: target,
            reference_date: reference,
            sharpe_ratio,
            cash_position,
            long_tickers: longs.iter().map(|r| r.ticker.clone()).collect(),
            short_tickers: shorts.iter().map(|r| r.ticker.clone()).collect(),
            positions,
            windows,
        })
    }
}

/// Latest timeline date strictly before `target`.
pub fn reference_day(timeline: &[NaiveDate], target: NaiveDate) -> Option<NaiveDate> {
    let end = timeline.partition_point(|d| *d < target);
    end.checked_sub(1).map(|i| timeline[i])
}

/// Backtests `[reference - days, reference]`, clipped to the configured start.
pub fn evaluate_window(
    frames: &[TickerFrame],
    alphas: &[&AlphaColumn],
    config: &BacktestConfig,
    window: LookbackWindow,
    reference: NaiveDate,
) -> WindowOutcome {
    let start = (reference - Duration::days(window.days)).max(config.start_date);
    match run_backtest(frames, alphas, &config.with_range(start, reference)) {
        Ok(stats) => WindowOutcome {
            label: window.label,
            start_date: start,
            sharpe_ratio: Some(stats.sharpe_ratio),
            error: None,
        },
        Err(e) => WindowOutcome {
            label: window.label,
            start_date: start,
            sharpe_ratio: None,
            error: Some(e.to_string()),
        },
    }
}

/// Window with strictly the greatest Sharpe; the earliest wins on ties.
pub fn select_best(outcomes: &[WindowOutcome]) -> Option<(&'static str, f64)> {
    let mut best: Option<(&'static str, f64)> = None;
    let mut best_sharpe = f64::NEG_INFINITY;
    for outcome in outcomes {
        if let Some(sharpe) = outcome.sharpe_ratio {
            if sharpe > best_sharpe {
                best_sharpe = sharpe;
                best = Some((outcome.label, sharpe));
            }
        }
    }
    best
}

/// Sample std of close-to-close returns over the last 30 rows through
/// `reference`. Tickers not priced on `reference`, or with fewer than six
/// rows, get [`DEFAULT_VOLATILITY`].
pub fn trailing_volatility(frame: &TickerFrame, reference: NaiveDate) -> f64 {
    if !frame.has_date(reference) {
        return DEFAULT_VOLATILITY;
    }
    let rows = frame.history_through(reference, VOLATILITY_ROWS);
    if rows.len() < MIN_VOLATILITY_ROWS {
        return DEFAULT_VOLATILITY;
    }
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    sample_std(&pct_changes(&closes))
}

/// Normalized `alpha_strength · vol_factor` weights, equal weight when they
/// sum to zero.
fn side_weights(side: &[&RankedTicker], volatilities: &HashMap<&str, f64>) -> Vec<(f64, f64)> {
    let scale = side
        .iter()
        .map(|r| r.composite.abs())
        .fold(MIN_ALPHA_SCALE, f64::max);

    let raw: Vec<(f64, f64)> = side
        .iter()
        .map(|r| {
            let strength = r.composite.abs() / scale;
            let vol = volatilities
                .get(r.ticker.as_str())
                .copied()
                .unwrap_or(DEFAULT_VOLATILITY);
            (strength, strength * DEFAULT_VOLATILITY / vol.max(VOLATILITY_FLOOR))
        })
        .collect();

    let total: f64 = raw.iter().map(|(_, w)| w).sum();
    let equal = 1.0 / side.len().max(1) as f64;
    raw.into_iter()
        .map(|(strength, w)| {
            let weight = if total > 0.0 { w / total } else { equal };
            (strength, weight)
        })
        .collect()
}

fn size_side(
    side: Side,
    tickers: &[&RankedTicker],
    volatilities: &HashMap<&str, f64>,
    prices: &HashMap<String, f64>,
    equity: f64,
) -> Vec<PositionRecommendation> {
    if tickers.is_empty() {
        return Vec::new();
    }
    let book = equity * SIDE_FRACTION;
    let weights = side_weights(tickers, volatilities);

    tickers
        .iter()
        .zip(weights)
        .filter_map(|(r, (strength_weight, weight))| {
            let price = prices
                .get(&r.ticker)
                .copied()
                .filter(|p| p.is_finite() && *p > 0.0)?;
            let capital_allocation = weight * book;
            Some(PositionRecommendation {
                ticker: r.ticker.clone(),
                position: side,
                units: (capital_allocation / price).floor() as i64,
                price,
                capital_allocation,
                allocation_percentage: weight * 50.0,
                alpha_strength: r.composite,
                strength_weight,
                volatility: volatilities
                    .get(r.ticker.as_str())
                    .copied()
                    .unwrap_or(DEFAULT_VOLATILITY),
            })
        })
        .collect()
}
