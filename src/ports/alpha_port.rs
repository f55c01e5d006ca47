//! Alpha computation port trait.

use chrono::NaiveDate;

use crate::domain::alpha::AlphaColumn;
use crate::domain::error::AlphatraderError;
use crate::domain::frame::TickerFrame;

/// A named alpha source.
///
/// `compute` is a pure function of the frames: it returns the alpha's value for
/// every `(ticker, date)` it can score within `trade_range` and never mutates
/// the frames. Pairs it cannot score are simply left out of the column.
pub trait AlphaPort: Send + Sync {
    fn name(&self) -> &str;

    fn compute(
        &self,
        frames: &[TickerFrame],
        trade_range: &[NaiveDate],
    ) -> Result<AlphaColumn, AlphatraderError>;
}
