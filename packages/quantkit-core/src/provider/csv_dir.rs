//! Market data provider backed by a directory of CSV files.
//!
//! Layout:
//!
//! ```text
//! data/
//!   AAPL.csv        Date,Open,High,Low,Close,Volume (closes need only Date and Close)
//!   MSFT.csv
//!   companies.json  {"AAPL": {"name": "Apple Inc.", "sector": "Technology", ...}}
//! ```

use super::MarketDataProvider;
use crate::persistence::{load_csv, save_csv};
use crate::types::{Bar, BarSeries, CompanyInfo, DateTable, PriceSeries};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const COMPANIES_FILE: &str = "companies.json";

/// Reads price history from `<dir>/<SYMBOL>.csv` and metadata from `<dir>/companies.json`.
#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn history_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_uppercase()))
    }

    fn load_table(&self, symbol: &str) -> Result<(PathBuf, DateTable)> {
        let path = self.history_path(symbol);
        if !path.exists() {
            return Err(Error::FetchFailure(format!(
                "no history file for {} at {}",
                symbol.to_uppercase(),
                path.display()
            )));
        }

        let table = load_csv(&path)?;
        Ok((path, table))
    }

    /// Load the full history file for `symbol`, surfacing every failure.
    pub fn load_history(&self, symbol: &str) -> Result<PriceSeries> {
        let (path, table) = self.load_table(symbol)?;
        let close_idx = column_index(&table, "Close", &path)?;

        let points = table
            .index()
            .iter()
            .zip(table.column_at(close_idx))
            .filter(|(_, close)| !close.is_nan())
            .map(|(date, close)| (*date, close))
            .collect();

        PriceSeries::new(symbol, points)
    }

    /// Load the full bar file for `symbol`.
    ///
    /// Needs `Open`, `High`, `Low`, `Close` and `Volume` columns. Rows with an
    /// empty cell in any of them are skipped.
    pub fn load_bars(&self, symbol: &str) -> Result<BarSeries> {
        let (path, table) = self.load_table(symbol)?;
        let [open, high, low, close, volume] = ["Open", "High", "Low", "Close", "Volume"]
            .map(|name| column_index(&table, name, &path));
        let (open, high, low, close, volume) = (open?, high?, low?, close?, volume?);

        let bars = table
            .index()
            .iter()
            .zip(table.rows())
            .map(|(date, row)| Bar {
                date: *date,
                open: row[open],
                high: row[high],
                low: row[low],
                close: row[close],
                volume: row[volume],
            })
            .filter(|bar| {
                [bar.open, bar.high, bar.low, bar.close, bar.volume]
                    .iter()
                    .all(|v| !v.is_nan())
            })
            .collect();

        BarSeries::new(symbol, bars)
    }

    /// Write a price history as `<dir>/<SYMBOL>.csv` with a single `Close` column.
    pub fn save_history(&self, series: &PriceSeries) -> Result<()> {
        let table = DateTable::new(
            series.dates(),
            vec!["Close".to_string()],
            series.values().into_iter().map(|v| vec![v]).collect(),
        )?;
        save_csv(&table, &self.history_path(&series.symbol))
    }

    /// Load every entry of `companies.json`, keyed by uppercase symbol.
    pub fn load_companies(&self) -> Result<BTreeMap<String, CompanyInfo>> {
        let path = self.dir.join(COMPANIES_FILE);
        let content = fs::read_to_string(&path)?;
        let companies: BTreeMap<String, CompanyInfo> = serde_json::from_str(&content)?;
        Ok(companies
            .into_iter()
            .map(|(symbol, info)| (symbol.to_uppercase(), info))
            .collect())
    }
}

fn column_index(table: &DateTable, name: &str, path: &Path) -> Result<usize> {
    table
        .columns()
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::FetchFailure(format!("{} has no {} column", path.display(), name)))
}

impl MarketDataProvider for CsvDirectoryProvider {
    fn fetch_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        match self.load_history(symbol) {
            Ok(series) => {
                let window = series.window(start, end);
                debug!(symbol, points = window.len(), "loaded history");
                window
            }
            Err(e) => {
                warn!(symbol, error = %e, "failed to load history");
                PriceSeries::empty(symbol)
            }
        }
    }

    fn fetch_bars(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> BarSeries {
        match self.load_bars(symbol) {
            Ok(bars) => bars.window(start, end),
            Err(e) => {
                warn!(symbol, error = %e, "failed to load bars");
                BarSeries::empty(symbol)
            }
        }
    }

    fn fetch_live_price(&self, symbol: &str) -> Option<f64> {
        match self.load_history(symbol) {
            Ok(series) => series.last().map(|(_, price)| price),
            Err(e) => {
                warn!(symbol, error = %e, "failed to load live price");
                None
            }
        }
    }

    fn fetch_company_info(&self, symbol: &str) -> Option<CompanyInfo> {
        match self.load_companies() {
            Ok(mut companies) => companies.remove(&symbol.to_uppercase()),
            Err(e) => {
                warn!(symbol, error = %e, "failed to load company info");
                None
            }
        }
    }
}
