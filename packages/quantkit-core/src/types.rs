//! Core data types for the QuantKit analysis layer.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closing prices of one instrument, ordered by date with no duplicate dates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(try_from = "PriceSeriesData")]
pub struct PriceSeries {
    /// Ticker symbol (uppercase)
    pub symbol: String,
    points: Vec<(NaiveDate, f64)>,
}

#[derive(Deserialize)]
struct PriceSeriesData {
    symbol: String,
    points: Vec<(NaiveDate, f64)>,
}

impl TryFrom<PriceSeriesData> for PriceSeries {
    type Error = Error;

    fn try_from(data: PriceSeriesData) -> Result<Self> {
        Self::new(&data.symbol, data.points)
    }
}

impl PriceSeries {
    /// Build a price series from (date, close) points in any order.
    ///
    /// Points are sorted chronologically. Two points on the same date are rejected.
    pub fn new(symbol: &str, mut points: Vec<(NaiveDate, f64)>) -> Result<Self> {
        points.sort_by_key(|(date, _)| *date);
        if let Some(pair) = points.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(Error::InvalidInput(format!(
                "duplicate date {} in price series for {}",
                pair[0].0,
                symbol.to_uppercase()
            )));
        }

        Ok(Self {
            symbol: symbol.to_uppercase(),
            points,
        })
    }

    /// Build a series of closes on consecutive calendar days starting at `start`.
    pub fn daily(symbol: &str, start: NaiveDate, closes: &[f64]) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            points: start
                .iter_days()
                .zip(closes.iter().copied())
                .collect(),
        }
    }

    /// Create a series with no data, the result of a failed fetch.
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            points: Vec::new(),
        }
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|(d, _)| *d).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, p)| *p).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent (date, close) point.
    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }

    /// Points falling in the half-open window `[start, end)`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            points: self
                .points
                .iter()
                .filter(|(d, _)| *d >= start && *d < end)
                .copied()
                .collect(),
        }
    }
}

/// One day of open, high, low and close prices with traded volume.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Daily bars of one instrument, ordered by date with no duplicate dates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(try_from = "BarSeriesData")]
pub struct BarSeries {
    /// Ticker symbol (uppercase)
    pub symbol: String,
    bars: Vec<Bar>,
}

#[derive(Deserialize)]
struct BarSeriesData {
    symbol: String,
    bars: Vec<Bar>,
}

impl TryFrom<BarSeriesData> for BarSeries {
    type Error = Error;

    fn try_from(data: BarSeriesData) -> Result<Self> {
        Self::new(&data.symbol, data.bars)
    }
}

impl BarSeries {
    /// Build a bar series from bars in any order.
    ///
    /// Bars are sorted chronologically. Duplicate dates and bars whose high is
    /// below their low are rejected.
    pub fn new(symbol: &str, mut bars: Vec<Bar>) -> Result<Self> {
        let symbol = symbol.to_uppercase();
        bars.sort_by_key(|bar| bar.date);
        if let Some(pair) = bars.windows(2).find(|pair| pair[0].date == pair[1].date) {
            return Err(Error::InvalidInput(format!(
                "duplicate date {} in bars for {}",
                pair[0].date, symbol
            )));
        }
        if let Some(bar) = bars.iter().find(|bar| bar.high < bar.low) {
            return Err(Error::InvalidInput(format!(
                "bar for {} on {} has high {} below low {}",
                symbol, bar.date, bar.high, bar.low
            )));
        }

        Ok(Self { symbol, bars })
    }

    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            bars: Vec::new(),
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Bars falling in the half-open window `[start, end)`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            bars: self
                .bars
                .iter()
                .filter(|b| b.date >= start && b.date < end)
                .copied()
                .collect(),
        }
    }

    /// Closing prices only.
    pub fn to_price_series(&self) -> PriceSeries {
        PriceSeries {
            symbol: self.symbol.clone(),
            points: self.bars.iter().map(|b| (b.date, b.close)).collect(),
        }
    }
}

/// How consecutive prices are turned into a return.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMethod {
    /// `p_t / p_{t-1} - 1`
    #[default]
    Simple,
    /// `ln(p_t / p_{t-1})`
    Log,
}

/// Per-period returns derived from a [`PriceSeries`].
///
/// Holds one point fewer than the source series: the first date has no return.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "ReturnSeriesData")]
pub struct ReturnSeries {
    /// Ticker symbol (uppercase)
    pub symbol: String,
    /// Differencing method used
    pub method: ReturnMethod,
    points: Vec<(NaiveDate, f64)>,
}

#[derive(Deserialize)]
struct ReturnSeriesData {
    symbol: String,
    method: ReturnMethod,
    points: Vec<(NaiveDate, f64)>,
}

impl TryFrom<ReturnSeriesData> for ReturnSeries {
    type Error = Error;

    fn try_from(data: ReturnSeriesData) -> Result<Self> {
        if data.points.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(Error::InvalidInput(format!(
                "return series for {} must have strictly increasing dates",
                data.symbol
            )));
        }
        Ok(Self::from_sorted(data.symbol, data.method, data.points))
    }
}

impl ReturnSeries {
    pub(crate) fn from_sorted(
        symbol: String,
        method: ReturnMethod,
        points: Vec<(NaiveDate, f64)>,
    ) -> Self {
        Self {
            symbol,
            method,
            points,
        }
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|(d, _)| *d).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, r)| *r).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A table indexed by date with one named `f64` column per series.
///
/// Rows are stored in chronological order. Missing values are `NaN`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(try_from = "DateTableData")]
pub struct DateTable {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct DateTableData {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl TryFrom<DateTableData> for DateTable {
    type Error = Error;

    fn try_from(data: DateTableData) -> Result<Self> {
        Self::new(data.index, data.columns, data.rows)
    }
}

impl DateTable {
    /// Build a table, checking that every row has one value per column and
    /// that the index is strictly increasing.
    pub fn new(index: Vec<NaiveDate>, columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if index.len() != rows.len() {
            return Err(Error::InvalidInput(format!(
                "index has {} dates but table has {} rows",
                index.len(),
                rows.len()
            )));
        }
        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(Error::InvalidInput(format!(
                "row has {} values, expected {}",
                row.len(),
                columns.len()
            )));
        }
        if index.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(Error::InvalidInput(
                "table index must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            index,
            columns,
            rows,
        })
    }

    /// Inner-join return series on date: a row exists for every date present
    /// in all series. Column order follows the input order.
    pub fn from_series(series: &[&ReturnSeries]) -> Self {
        let columns: Vec<String> = series.iter().map(|s| s.symbol.clone()).collect();
        let Some((first, rest)) = series.split_first() else {
            return Self::default();
        };

        let lookups: Vec<BTreeMap<NaiveDate, f64>> = rest
            .iter()
            .map(|s| s.points().iter().copied().collect())
            .collect();

        let mut index = Vec::new();
        let mut rows = Vec::new();
        for &(date, value) in first.points() {
            let others: Option<Vec<f64>> = lookups.iter().map(|m| m.get(&date).copied()).collect();
            if let Some(others) = others {
                let mut row = Vec::with_capacity(columns.len());
                row.push(value);
                row.extend(others);
                index.push(date);
                rows.push(row);
            }
        }

        Self {
            index,
            columns,
            rows,
        }
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of column `j`, top to bottom.
    pub fn column_at(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[j]).collect()
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|j| self.column_at(j))
    }

    /// Row-wise dot product with a weight vector aligned to the columns.
    pub fn dot(&self, weights: &[f64]) -> Result<Vec<f64>> {
        if weights.len() != self.columns.len() {
            return Err(Error::InvalidInput(format!(
                "{} weights for {} columns",
                weights.len(),
                self.columns.len()
            )));
        }

        Ok(self
            .rows
            .iter()
            .map(|row| row.iter().zip(weights).map(|(r, w)| r * w).sum())
            .collect())
    }

    /// Divide every column by its first value so all series start at 1.
    pub fn normalize(&self) -> Result<Self> {
        let Some(first) = self.rows.first() else {
            return Ok(self.clone());
        };
        if let Some(j) = first.iter().position(|v| *v == 0.0 || v.is_nan()) {
            return Err(Error::InvalidInput(format!(
                "column {} cannot be normalized: first value is {}",
                self.columns[j], first[j]
            )));
        }

        let rows = self
            .rows
            .iter()
            .map(|row| row.iter().zip(first).map(|(v, base)| v / base).collect())
            .collect();

        Ok(Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            rows,
        })
    }
}

/// Descriptive company metadata as supplied by a market data provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub country: String,
    pub website: String,
    pub description: String,
    /// Trailing price/earnings ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_pe: Option<f64>,
    /// Dividend yield as a fraction (0.02 for 2%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
}

/// Target of a weight optimization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Objective {
    /// Maximize the Sharpe ratio of the weighted daily return series.
    ///
    /// The annual rate is converted to a daily one (`risk_free_rate / 252`)
    /// before it is subtracted from the mean daily return, so both sides of
    /// the difference are per-day figures.
    MaxSharpe {
        /// Annual risk-free rate (e.g. 0.01 for 1%)
        risk_free_rate: f64,
    },
    /// Minimize annualized portfolio volatility
    MinVolatility,
}

/// Optimized portfolio weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Objective that was optimized
    pub objective: Objective,
    /// Weight per ticker, each in [0, 1], summing to 1
    pub weights: BTreeMap<String, f64>,
    /// Objective value at the returned weights (negated Sharpe for `MaxSharpe`)
    pub objective_value: f64,
    /// Solver iterations used
    pub iterations: u64,
}

/// Risk summary for a single daily return series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    /// Confidence level used for VaR and CVaR (e.g. 0.95)
    pub confidence_level: f64,
    /// Number of daily returns analyzed
    pub observations: usize,
    /// Mean daily return times 252
    pub annualized_return: f64,
    /// Annualized standard deviation of returns
    pub volatility: f64,
    /// Empirical (1 - confidence) quantile of daily returns
    pub value_at_risk: f64,
    /// Mean return at or below the VaR threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_value_at_risk: Option<f64>,
    /// Worst peak-to-trough decline of the compounded wealth curve (negative)
    pub max_drawdown: f64,
    /// Sharpe ratio, absent when volatility is zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<f64>,
    /// Sortino ratio, absent when downside deviation is undefined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortino_ratio: Option<f64>,
}

/// API response wrapper for success cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
