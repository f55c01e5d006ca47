//! Portfolio state, equity tracking and dollar-neutral rebalancing.

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use super::signal::SignalSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// What a single rebalance did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebalanceSummary {
    pub adjusted: usize,
    pub liquidated: usize,
    /// Gross traded notional.
    pub turnover: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    /// Share count per ticker; negative is short.
    pub shares: HashMap<String, f64>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Price usable for trading; NaN and non-positive closes count as unpriced.
fn tradable_price(price_map: &HashMap<String, f64>, ticker: &str) -> Option<f64> {
    price_map
        .get(ticker)
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0)
}

/// Equal weight per side: `1/n_long` and `-1/n_short`, 0 for an empty side.
pub fn side_weights(n_long: usize, n_short: usize) -> (f64, f64) {
    let w_long = if n_long > 0 { 1.0 / n_long as f64 } else { 0.0 };
    let w_short = if n_short > 0 { -1.0 / n_short as f64 } else { 0.0 };
    (w_long, w_short)
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            shares: HashMap::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn shares_of(&self, ticker: &str) -> f64 {
        self.shares.get(ticker).copied().unwrap_or(0.0)
    }

    pub fn holds(&self, ticker: &str) -> bool {
        self.shares.contains_key(ticker)
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }

    pub fn last_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.equity)
    }

    /// `cash + Σ shares·price` over held tickers that have a price.
    pub fn total_equity(&self, price_map: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .shares
            .iter()
            .filter_map(|(ticker, qty)| price_map.get(ticker).map(|&price| qty * price))
            .sum();
        self.cash + position_value
    }

    /// Moves `ticker` to `target` shares at `price`, settling the difference in cash.
    fn trade_to(&mut self, ticker: &str, target: f64, price: f64) -> f64 {
        let current = self.shares_of(ticker);
        let trade = target - current;
        self.cash -= trade * price;
        self.shares.insert(ticker.to_string(), target);
        trade
    }

    /// Closes the whole position in `ticker` at `price`. Returns the cash released.
    pub fn liquidate(&mut self, ticker: &str, price: f64) -> Option<f64> {
        let qty = self.shares.remove(ticker)?;
        let proceeds = qty * price;
        self.cash += proceeds;
        Some(proceeds)
    }

    /// Full-book rebalance to equal-weight long and short sleeves of `equity`.
    ///
    /// Signalled tickers without a usable price are skipped. Held tickers that
    /// are no longer LONG or SHORT are liquidated if priced; unpriced ones keep
    /// their position untouched.
    pub fn rebalance(
        &mut self,
        signals: &SignalSet,
        price_map: &HashMap<String, f64>,
        equity: f64,
    ) -> RebalanceSummary {
        let long_tickers = signals.long_tickers();
        let short_tickers = signals.short_tickers();
        let (w_long, w_short) = side_weights(long_tickers.len(), short_tickers.len());

        let mut summary = RebalanceSummary::default();

        for (tickers, weight) in [(&long_tickers, w_long), (&short_tickers, w_short)] {
            for ticker in tickers.iter() {
                let Some(price) = tradable_price(price_map, ticker) else {
                    continue;
                };
                let target = weight * equity / price;
                let traded = self.trade_to(ticker, target, price);
                summary.adjusted += 1;
                summary.turnover += (traded * price).abs();
            }
        }

        let stale: Vec<(String, f64)> = self
            .shares
            .keys()
            .filter(|t| !long_tickers.contains(&t.as_str()) && !short_tickers.contains(&t.as_str()))
            .filter_map(|t| tradable_price(price_map, t).map(|price| (t.clone(), price)))
            .collect();

        for (ticker, price) in stale {
            if let Some(proceeds) = self.liquidate(&ticker, price) {
                debug!("Liquidated {} for {:.2}", ticker, proceeds);
                summary.liquidated += 1;
                summary.turnover += proceeds.abs();
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{assign_signals, RankedTicker, Signal};
    use approx::assert_abs_diff_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn prices(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    fn signals(entries: &[(&str, Signal)]) -> SignalSet {
        SignalSet {
            ranked: entries
                .iter()
                .map(|(t, s)| RankedTicker {
                    ticker: t.to_string(),
                    composite: 0.0,
                    signal: *s,
                })
                .collect(),
        }
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100_000.0);
        assert_abs_diff_eq!(portfolio.cash, 100_000.0);
        assert!(portfolio.shares.is_empty());
        assert!(portfolio.equity_curve.is_empty());
        assert_eq!(portfolio.last_equity(), None);
    }

    #[test]
    fn side_weights_are_equal_per_side() {
        assert_eq!(side_weights(1, 1), (1.0, -1.0));
        assert_eq!(side_weights(4, 2), (0.25, -0.5));
        assert_eq!(side_weights(0, 0), (0.0, 0.0));
    }

    #[test]
    fn total_equity_skips_unpriced_holdings() {
        let mut portfolio = Portfolio::new(1_000.0);
        portfolio.shares.insert("A".into(), 10.0);
        portfolio.shares.insert("B".into(), -5.0);
        portfolio.cash = 500.0;

        let equity = portfolio.total_equity(&prices(&[("A", 20.0)]));
        assert_abs_diff_eq!(equity, 700.0);

        let equity = portfolio.total_equity(&prices(&[("A", 20.0), ("B", 10.0)]));
        assert_abs_diff_eq!(equity, 650.0);
    }

    #[test]
    fn rebalance_two_tickers_full_long_and_short() {
        let mut portfolio = Portfolio::new(100_000.0);
        let set = assign_signals(vec![("A".into(), 1.0), ("B".into(), -1.0)]);
        let px = prices(&[("A", 50.0), ("B", 25.0)]);

        let summary = portfolio.rebalance(&set, &px, 100_000.0);

        assert_eq!(summary.adjusted, 2);
        assert_abs_diff_eq!(summary.turnover, 200_000.0);
        assert_abs_diff_eq!(portfolio.shares_of("A"), 2_000.0);
        assert_abs_diff_eq!(portfolio.shares_of("B"), -4_000.0);
        // bought 100k of A, sold 100k of B
        assert_abs_diff_eq!(portfolio.cash, 100_000.0);
        assert_abs_diff_eq!(portfolio.total_equity(&px), 100_000.0);
    }

    #[test]
    fn rebalance_moves_to_target_from_existing_position() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.shares.insert("A".into(), 50.0);
        portfolio.cash = 5_000.0;
        let px = prices(&[("A", 100.0)]);

        portfolio.rebalance(&signals(&[("A", Signal::Long)]), &px, 10_000.0);

        assert_abs_diff_eq!(portfolio.shares_of("A"), 100.0);
        assert_abs_diff_eq!(portfolio.cash, 0.0);
    }

    #[test]
    fn dropped_ticker_is_liquidated() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.shares.insert("A".into(), -20.0);
        portfolio.cash = 12_000.0;
        let px = prices(&[("A", 110.0), ("B", 10.0)]);
        let set = signals(&[("A", Signal::Neutral), ("B", Signal::Long)]);

        let cash_before = portfolio.cash;
        let summary = portfolio.rebalance(&set, &px, 9_800.0);

        assert_eq!(summary.liquidated, 1);
        // 9.8k bought plus 2.2k covered
        assert_abs_diff_eq!(summary.turnover, 12_000.0);
        assert!(!portfolio.holds("A"));
        // the B purchase and the A cover both come out of cash
        assert_abs_diff_eq!(portfolio.cash, cash_before - 9_800.0 + (-20.0 * 110.0));
    }

    #[test]
    fn nan_price_is_not_traded() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.shares.insert("A".into(), 5.0);
        let px = prices(&[("A", f64::NAN), ("B", 10.0)]);

        portfolio.rebalance(&signals(&[("B", Signal::Long)]), &px, 10_000.0);

        assert_abs_diff_eq!(portfolio.shares_of("A"), 5.0);
        assert_abs_diff_eq!(portfolio.shares_of("B"), 1_000.0);
        assert!(portfolio.cash.is_finite());
    }

    #[test]
    fn unpriced_holding_is_left_untouched() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.shares.insert("STALE".into(), 7.0);
        let cash = portfolio.cash;

        let px = prices(&[("B", 10.0)]);
        portfolio.rebalance(&signals(&[("B", Signal::Neutral)]), &px, 10_000.0);

        assert_abs_diff_eq!(portfolio.shares_of("STALE"), 7.0);
        assert_abs_diff_eq!(portfolio.cash, cash);
    }

    #[test]
    fn signalled_ticker_without_price_is_skipped() {
        let mut portfolio = Portfolio::new(10_000.0);
        let set = signals(&[("A", Signal::Long), ("B", Signal::Short)]);
        portfolio.rebalance(&set, &prices(&[("B", 10.0)]), 10_000.0);

        assert!(!portfolio.holds("A"));
        assert_abs_diff_eq!(portfolio.shares_of("B"), -1_000.0);
    }

    #[test]
    fn liquidate_returns_proceeds() {
        let mut portfolio = Portfolio::new(0.0);
        portfolio.shares.insert("A".into(), 3.0);
        assert_eq!(portfolio.liquidate("A", 10.0), Some(30.0));
        assert_eq!(portfolio.liquidate("A", 10.0), None);
        assert_abs_diff_eq!(portfolio.cash, 30.0);
    }

    #[test]
    fn record_equity() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.record_equity(date(), 105_000.0);
        assert_eq!(portfolio.equity_curve.len(), 1);
        assert_eq!(portfolio.equity_curve[0].date, date());
        assert_eq!(portfolio.last_equity(), Some(105_000.0));
    }
}
