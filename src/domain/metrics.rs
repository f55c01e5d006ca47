//! Performance statistics over a recorded equity curve.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::AlphatraderError;
use super::portfolio::EquityPoint;
use super::stats::{mean, sample_std};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PnlStats {
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub annualized_volatility_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    /// Longest run of consecutive points below the running peak.
    pub max_drawdown_duration: usize,
    pub final_equity: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub daily_returns: Vec<ReturnPoint>,
    /// `(equity / equity[0] - 1) * 100` per recorded point.
    pub cumulative_returns: Vec<ReturnPoint>,
}

impl PnlStats {
    /// Derives return and risk statistics from `equity_curve`.
    ///
    /// Fails with fewer than two points or when no point holds a number.
    pub fn compute(equity_curve: &[EquityPoint]) -> Result<Self, AlphatraderError> {
        if equity_curve.len() < 2 {
            return Err(AlphatraderError::InsufficientEquity {
                points: equity_curve.len(),
            });
        }
        if equity_curve.iter().all(|p| p.equity.is_nan()) {
            return Err(AlphatraderError::UndefinedEquity);
        }

        let daily_returns: Vec<ReturnPoint> = equity_curve
            .windows(2)
            .map(|w| ReturnPoint {
                date: w[1].date,
                value: w[1].equity / w[0].equity - 1.0,
            })
            .filter(|r| r.value.is_finite())
            .collect();
        let returns: Vec<f64> = daily_returns.iter().map(|r| r.value).collect();

        let base = equity_curve[0].equity;
        let cumulative_returns: Vec<ReturnPoint> = equity_curve
            .iter()
            .map(|p| ReturnPoint {
                date: p.date,
                value: (p.equity / base - 1.0) * 100.0,
            })
            .collect();
        let final_equity = equity_curve[equity_curve.len() - 1].equity;
        let total_return_pct = (final_equity / base - 1.0) * 100.0;

        let annualized_return = mean(&returns) * TRADING_DAYS_PER_YEAR;
        let annualized_volatility = sample_std(&returns) * TRADING_DAYS_PER_YEAR.sqrt();
        let sharpe_ratio = if annualized_volatility > 0.0 {
            annualized_return / annualized_volatility
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        Ok(PnlStats {
            total_return_pct,
            annualized_return_pct: annualized_return * 100.0,
            annualized_volatility_pct: annualized_volatility * 100.0,
            sharpe_ratio,
            max_drawdown_pct: max_drawdown * 100.0,
            max_drawdown_duration,
            final_equity,
            equity_curve: equity_curve.to_vec(),
            daily_returns,
            cumulative_returns,
        })
    }
}

/// Minimum of `(equity - running_max) / running_max` (zero or negative) and the
/// longest stretch spent below the running max.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    let mut run = 0usize;
    let mut longest = 0usize;

    for point in equity_curve {
        if point.equity.is_nan() {
            continue;
        }
        if point.equity >= peak {
            peak = point.equity;
            run = 0;
            continue;
        }
        let dd = (point.equity - peak) / peak;
        if dd < max_dd {
            max_dd = dd;
        }
        run += 1;
        longest = longest.max(run);
    }

    (max_dd, longest)
}
