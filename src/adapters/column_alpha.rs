//! Alpha read straight from a precomputed numeric column of the data files.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::domain::alpha::AlphaColumn;
use crate::domain::error::AlphatraderError;
use crate::domain::frame::TickerFrame;
use crate::ports::alpha_port::AlphaPort;

pub struct ColumnAlpha {
    name: String,
    column: String,
}

impl ColumnAlpha {
    pub fn new(name: &str, column: &str) -> Self {
        Self {
            name: name.to_string(),
            column: column.to_string(),
        }
    }
}

impl AlphaPort for ColumnAlpha {
    fn name(&self) -> &str {
        &self.name
    }

    /// Fails when no frame carries the column at all, which is almost always
    /// a typo in the config.
    fn compute(
        &self,
        frames: &[TickerFrame],
        trade_range: &[NaiveDate],
    ) -> Result<AlphaColumn, AlphatraderError> {
        let dates: HashSet<NaiveDate> = trade_range.iter().copied().collect();
        let mut alpha = AlphaColumn::new(&self.name);
        let mut seen = false;

        for frame in frames {
            for row in frame.rows.iter().filter(|r| dates.contains(&r.date)) {
                if let Some(&value) = row.columns.get(&self.column) {
                    alpha.insert(&frame.ticker, row.date, value);
                    seen = true;
                }
            }
        }

        if !seen && !frames.is_empty() && !trade_range.is_empty() {
            return Err(AlphatraderError::AlphaCompute {
                alpha: self.name.clone(),
                reason: format!("column '{}' not found in any data file", self.column),
            });
        }
        Ok(alpha)
    }
}
