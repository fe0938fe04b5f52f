//! In-memory market data provider.

use super::MarketDataProvider;
use crate::types::{BarSeries, CompanyInfo, PriceSeries};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Provider serving data held in memory.
///
/// Useful for tests, for replaying data loaded elsewhere, and as a cache in
/// front of a slower source.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    history: BTreeMap<String, PriceSeries>,
    bars: BTreeMap<String, BarSeries>,
    info: BTreeMap<String, CompanyInfo>,
    live: BTreeMap<String, f64>,
}

impl StaticProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a price history, replacing any existing one for the same symbol.
    pub fn with_history(mut self, series: PriceSeries) -> Self {
        self.insert_history(series);
        self
    }

    /// Add closes on consecutive calendar days starting at `start`.
    pub fn with_prices(self, symbol: &str, start: NaiveDate, closes: &[f64]) -> Self {
        self.with_history(PriceSeries::daily(symbol, start, closes))
    }

    /// Add daily bars. Their closes also replace the symbol's price history.
    pub fn with_bars(mut self, bars: BarSeries) -> Self {
        self.insert_history(bars.to_price_series());
        self.bars.insert(bars.symbol.clone(), bars);
        self
    }

    /// Add company metadata.
    pub fn with_company_info(mut self, symbol: &str, info: CompanyInfo) -> Self {
        self.info.insert(symbol.to_uppercase(), info);
        self
    }

    /// Add a live quote. Without one, the last close is reported.
    pub fn with_live_price(mut self, symbol: &str, price: f64) -> Self {
        self.live.insert(symbol.to_uppercase(), price);
        self
    }

    pub fn insert_history(&mut self, series: PriceSeries) {
        self.history.insert(series.symbol.clone(), series);
    }

    /// Symbols with price history.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.history.keys().map(String::as_str)
    }
}

impl MarketDataProvider for StaticProvider {
    fn fetch_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        match self.history.get(&symbol.to_uppercase()) {
            Some(series) => series.window(start, end),
            None => {
                debug!(symbol, "no history held in memory");
                PriceSeries::empty(symbol)
            }
        }
    }

    fn fetch_bars(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> BarSeries {
        self.bars
            .get(&symbol.to_uppercase())
            .map(|bars| bars.window(start, end))
            .unwrap_or_else(|| BarSeries::empty(symbol))
    }

    fn fetch_live_price(&self, symbol: &str) -> Option<f64> {
        let symbol = symbol.to_uppercase();
        self.live.get(&symbol).copied().or_else(|| {
            self.history
                .get(&symbol)
                .and_then(|s| s.last())
                .map(|(_, price)| price)
        })
    }

    fn fetch_company_info(&self, symbol: &str) -> Option<CompanyInfo> {
        self.info.get(&symbol.to_uppercase()).cloned()
    }
}
