//! Alphas derived from closing prices alone.
//!
//! MOMENTUM(n)[i] = C[i] / C[i-n] - 1, or 0 when C[i-n] == 0.
//! MEAN_REVERSION(n)[i] = -(C[i] - SMA(n)[i]) / STDDEV(n)[i], or 0 when the
//! population std over the window is 0.
//! Warmup rows have no value and are left out of the column.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::domain::alpha::AlphaColumn;
use crate::domain::error::AlphatraderError;
use crate::domain::frame::{FrameRow, TickerFrame};
use crate::domain::stats::{mean, population_std};
use crate::ports::alpha_port::AlphaPort;

fn compute_rolling<F>(
    name: &str,
    frames: &[TickerFrame],
    trade_range: &[NaiveDate],
    warmup: usize,
    score: F,
) -> AlphaColumn
where
    F: Fn(&[FrameRow]) -> f64,
{
    let dates: HashSet<NaiveDate> = trade_range.iter().copied().collect();
    let mut alpha = AlphaColumn::new(name);

    for frame in frames {
        for i in warmup..frame.rows.len() {
            let row = &frame.rows[i];
            if dates.contains(&row.date) {
                alpha.insert(&frame.ticker, row.date, score(&frame.rows[i - warmup..=i]));
            }
        }
    }
    alpha
}

pub struct MomentumAlpha {
    name: String,
    period: usize,
}

impl MomentumAlpha {
    pub fn new(name: &str, period: usize) -> Self {
        Self {
            name: name.to_string(),
            period,
        }
    }
}

impl AlphaPort for MomentumAlpha {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(
        &self,
        frames: &[TickerFrame],
        trade_range: &[NaiveDate],
    ) -> Result<AlphaColumn, AlphatraderError> {
        Ok(compute_rolling(&self.name, frames, trade_range, self.period, |window| {
            let prev = window[0].close;
            let curr = window[window.len() - 1].close;
            if prev == 0.0 { 0.0 } else { curr / prev - 1.0 }
        }))
    }
}

pub struct MeanReversionAlpha {
    name: String,
    period: usize,
}

impl MeanReversionAlpha {
    pub fn new(name: &str, period: usize) -> Self {
        Self {
            name: name.to_string(),
            period,
        }
    }
}

impl AlphaPort for MeanReversionAlpha {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(
        &self,
        frames: &[TickerFrame],
        trade_range: &[NaiveDate],
    ) -> Result<AlphaColumn, AlphatraderError> {
        let warmup = self.period.saturating_sub(1);
        Ok(compute_rolling(&self.name, frames, trade_range, warmup, |window| {
            let closes: Vec<f64> = window.iter().map(|r| r.close).collect();
            let sma = mean(&closes);
            let std = population_std(&closes);
            let curr = closes[closes.len() - 1];
            if std == 0.0 { 0.0 } else { -(curr - sma) / std }
        }))
    }
}
