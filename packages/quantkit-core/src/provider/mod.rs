//! Market data providers.
//!
//! A provider supplies price history, daily bars, live quotes and company
//! metadata for a ticker. Failures never surface as errors here: a failed
//! history or bar fetch is an empty series, a failed quote or metadata lookup
//! is `None`. Callers skip the
//! instrument and move on.

mod csv_dir;
mod memory;

pub use csv_dir::CsvDirectoryProvider;
pub use memory::StaticProvider;

use crate::types::{BarSeries, CompanyInfo, PriceSeries};
use chrono::NaiveDate;

/// Source of market data for the analysis layer.
pub trait MarketDataProvider {
    /// Closing prices for `symbol` in the half-open window `[start, end)`.
    ///
    /// Returns an empty series when no data is available.
    fn fetch_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PriceSeries;

    /// Open, high, low, close and volume for `symbol` in `[start, end)`.
    ///
    /// Providers that only know closing prices return an empty series.
    fn fetch_bars(&self, symbol: &str, _start: NaiveDate, _end: NaiveDate) -> BarSeries {
        BarSeries::empty(symbol)
    }

    /// Latest known price for `symbol`.
    fn fetch_live_price(&self, symbol: &str) -> Option<f64>;

    /// Company metadata for `symbol`.
    fn fetch_company_info(&self, symbol: &str) -> Option<CompanyInfo>;
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for &P {
    fn fetch_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        (**self).fetch_history(symbol, start, end)
    }

    fn fetch_bars(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> BarSeries {
        (**self).fetch_bars(symbol, start, end)
    }

    fn fetch_live_price(&self, symbol: &str) -> Option<f64> {
        (**self).fetch_live_price(symbol)
    }

    fn fetch_company_info(&self, symbol: &str) -> Option<CompanyInfo> {
        (**self).fetch_company_info(symbol)
    }
}
