//! Daily simulation loop.
//!
//! A [`Trader`] is built fresh for every backtest (and for every lookback
//! window of a recommendation); its portfolio state is discarded with it.

use chrono::NaiveDate;
use log::{debug, info, warn};

use super::alpha::AlphaColumn;
use super::error::AlphatraderError;
use super::frame::{build_unified_timeline, price_map, trade_range, TickerFrame};
use super::metrics::PnlStats;
use super::portfolio::Portfolio;
use super::signal::{SignalGenerator, SignalSet};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
}

impl BacktestConfig {
    pub fn with_range(&self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            ..self.clone()
        }
    }
}

pub struct Trader<'a> {
    frames: &'a [TickerFrame],
    generator: SignalGenerator<'a>,
    config: BacktestConfig,
    portfolio: Portfolio,
    trade_dates: Vec<NaiveDate>,
}

impl<'a> Trader<'a> {
    pub fn new(
        frames: &'a [TickerFrame],
        alphas: &'a [&'a AlphaColumn],
        config: BacktestConfig,
    ) -> Self {
        let trade_dates = trade_range(
            &build_unified_timeline(frames),
            config.start_date,
            config.end_date,
        );
        Self {
            frames,
            generator: SignalGenerator::new(frames, alphas),
            portfolio: Portfolio::new(config.initial_capital),
            config,
            trade_dates,
        }
    }

    pub fn trade_dates(&self) -> &[NaiveDate] {
        &self.trade_dates
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn generate_signals(&self, date: NaiveDate) -> SignalSet {
        self.generator.generate_ranked(date)
    }

    /// Marks the book to market, records equity and rebalances, date by date.
    ///
    /// Dates where no ticker has a row are skipped and leave no equity point.
    pub fn run_backtest(&mut self) -> Result<(), AlphatraderError> {
        if self.frames.is_empty() {
            return Err(AlphatraderError::NoTickers);
        }

        info!("Running backtest over {} dates", self.trade_dates.len());

        for &date in &self.trade_dates {
            let prices = price_map(self.frames, date);
            if prices.is_empty() {
                continue;
            }

            let mut equity = self.portfolio.total_equity(&prices);
            if equity.is_nan() {
                warn!("Equity is NaN on {}", date);
                equity = self
                    .portfolio
                    .last_equity()
                    .unwrap_or(self.config.initial_capital);
            }
            self.portfolio.record_equity(date, equity);

            let signals = self.generator.generate_ranked(date);
            let summary = self.portfolio.rebalance(&signals, &prices, equity);
            debug!(
                "{}: equity {:.2}, {} adjusted, {} liquidated, turnover {:.2}",
                date, equity, summary.adjusted, summary.liquidated, summary.turnover
            );
        }

        Ok(())
    }

    pub fn get_pnl_stats(&self) -> Result<PnlStats, AlphatraderError> {
        if self.frames.is_empty() {
            return Err(AlphatraderError::NoTickers);
        }
        PnlStats::compute(&self.portfolio.equity_curve)
    }
}

/// Runs one complete backtest and returns its statistics.
pub fn run_backtest(
    frames: &[TickerFrame],
    alphas: &[&AlphaColumn],
    config: &BacktestConfig,
) -> Result<PnlStats, AlphatraderError> {
    let mut trader = Trader::new(frames, alphas, config.clone());
    trader.run_backtest()?;
    trader.get_pnl_stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::FrameRow;
    use approx::assert_abs_diff_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn config() -> BacktestConfig {
        BacktestConfig {
            start_date: d(1),
            end_date: d(31),
            initial_capital: 100_000.0,
        }
    }

    fn frame(ticker: &str, closes: &[(u32, f64)]) -> TickerFrame {
        TickerFrame::new(
            ticker.into(),
            closes
                .iter()
                .map(|&(day, c)| FrameRow::new(d(day), c, true))
                .collect(),
        )
    }

    #[test]
    fn config_with_range_keeps_capital() {
        let c = config().with_range(d(5), d(6));
        assert_eq!(c.start_date, d(5));
        assert_eq!(c.end_date, d(6));
        assert_abs_diff_eq!(c.initial_capital, 100_000.0);
    }

    #[test]
    fn empty_universe_is_inert() {
        let mut trader = Trader::new(&[], &[], config());
        assert!(matches!(trader.run_backtest(), Err(AlphatraderError::NoTickers)));
        assert!(matches!(trader.get_pnl_stats(), Err(AlphatraderError::NoTickers)));
    }

    #[test]
    fn trade_dates_respect_range() {
        let frames = vec![frame("A", &[(1, 10.0), (2, 10.0), (3, 10.0)])];
        let trader = Trader::new(&frames, &[], config().with_range(d(2), d(3)));
        assert_eq!(trader.trade_dates(), &[d(2), d(3)]);
    }

    #[test]
    fn long_short_pair_tracks_prices() {
        let frames = vec![
            frame("A", &[(1, 10.0), (2, 11.0), (3, 12.0)]),
            frame("B", &[(1, 20.0), (2, 20.0), (3, 18.0)]),
        ];
        let alpha = AlphaColumn::new("x")
            .with_value("A", d(1), 1.0)
            .with_value("B", d(1), -1.0)
            .with_value("A", d(2), 1.0)
            .with_value("B", d(2), -1.0)
            .with_value("A", d(3), 1.0)
            .with_value("B", d(3), -1.0);
        let alphas = [&alpha];
        let mut trader = Trader::new(&frames, &alphas, config());
        trader.run_backtest().unwrap();

        let curve = &trader.portfolio().equity_curve;
        assert_eq!(curve.len(), 3);
        assert_abs_diff_eq!(curve[0].equity, 100_000.0);
        // long 10k A shares gains 10k; short 5k B shares flat
        assert_abs_diff_eq!(curve[1].equity, 110_000.0, epsilon = 1e-6);

        let stats = trader.get_pnl_stats().unwrap();
        assert_abs_diff_eq!(stats.final_equity, curve[2].equity);
    }

    #[test]
    fn dates_without_prices_leave_no_point() {
        let frames = vec![frame("A", &[(1, 10.0), (3, 10.0)])];
        let mut trader = Trader::new(&frames, &[], config());
        trader.run_backtest().unwrap();
        let dates: Vec<NaiveDate> = trader
            .portfolio()
            .equity_curve
            .iter()
            .map(|p| p.date)
            .collect();
        assert_eq!(dates, vec![d(1), d(3)]);
    }

    #[test]
    fn nan_equity_falls_back_to_previous_value() {
        let frames = vec![
            frame("A", &[(1, 10.0), (2, f64::NAN), (3, 10.0)]),
            frame("B", &[(1, 10.0), (2, 10.0), (3, 10.0)]),
        ];
        let alpha = AlphaColumn::new("x")
            .with_value("A", d(1), 1.0)
            .with_value("B", d(1), -1.0);
        let alphas = [&alpha];
        let mut trader = Trader::new(&frames, &alphas, config().with_range(d(1), d(2)));
        trader.run_backtest().unwrap();

        let curve = &trader.portfolio().equity_curve;
        assert_eq!(curve.len(), 2);
        assert_abs_diff_eq!(curve[1].equity, curve[0].equity);
    }
}
