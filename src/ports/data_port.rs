//! Data access port trait.

use crate::domain::error::AlphatraderError;
use crate::domain::frame::TickerFrame;
use chrono::NaiveDate;

pub trait DataPort {
    /// Rows for `ticker` dated within `[start_date, end_date]`, sorted by date.
    fn fetch_frame(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TickerFrame, AlphatraderError>;

    fn list_tickers(&self) -> Result<Vec<String>, AlphatraderError>;

    /// First date, last date and row count of everything stored for `ticker`.
    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AlphatraderError>;
}
