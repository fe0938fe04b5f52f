//! Weighted instrument holdings and return aggregation.

use crate::analysis::returns::{annualized_covariance, annualized_return, portfolio_volatility, returns};
use crate::analysis::risk::risk_report;
use crate::provider::MarketDataProvider;
use crate::types::{DateTable, OptimizationResult, PriceSeries, ReturnMethod, RiskReport};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// How existing weights react when the instrument set changes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddPolicy {
    /// Leave existing weights untouched. A new instrument without an explicit
    /// weight gets `1 / len` after insertion, so weights may no longer sum to 1.
    #[default]
    Preserve,
    /// Rescale the other weights proportionally so all weights sum to 1.
    Renormalize,
}

/// A weighted collection of instruments sharing one date window.
///
/// The stocks and weights maps always have the same keys. The per-date return
/// table is built on first use and discarded whenever the instrument set or
/// the return method changes.
#[derive(Debug, Clone)]
pub struct Portfolio {
    name: String,
    start: NaiveDate,
    end: NaiveDate,
    method: ReturnMethod,
    add_policy: AddPolicy,
    stocks: BTreeMap<String, PriceSeries>,
    weights: BTreeMap<String, f64>,
    returns: OnceCell<DateTable>,
}

/// Fetch a history and keep it only if returns can be computed from it.
fn fetch_usable(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    method: ReturnMethod,
) -> Option<PriceSeries> {
    let series = provider.fetch_history(symbol, start, end);
    if series.len() < 2 {
        warn!(
            symbol,
            points = series.len(),
            "skipping instrument without enough price history"
        );
        return None;
    }
    // Zero, negative or non-finite closes would poison every aggregate later
    if let Err(e) = returns(&series, method) {
        warn!(symbol, error = %e, "skipping instrument with unusable prices");
        return None;
    }
    Some(series)
}

impl Portfolio {
    /// Create a portfolio by fetching each symbol's history for `[start, end)`.
    ///
    /// Symbols whose fetch yields fewer than two prices, or any close that is
    /// not a positive finite number, are left out. Without
    /// explicit weights every requested symbol is assigned `1 / N`, N being
    /// the number of requested symbols; weights of left-out symbols are
    /// dropped. Explicit weights must name every fetched symbol.
    ///
    /// Fails with [`Error::FetchFailure`] if no symbol could be fetched.
    pub fn new<S: AsRef<str>>(
        provider: &dyn MarketDataProvider,
        symbols: &[S],
        start: NaiveDate,
        end: NaiveDate,
        weights: Option<BTreeMap<String, f64>>,
    ) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidInput(format!(
                "start date {} must be before end date {}",
                start, end
            )));
        }

        let mut requested: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.as_ref().trim().to_uppercase();
            if !symbol.is_empty() && !requested.contains(&symbol) {
                requested.push(symbol);
            }
        }
        if requested.is_empty() {
            return Err(Error::InvalidInput(
                "a portfolio needs at least one symbol".to_string(),
            ));
        }

        let stocks: BTreeMap<String, PriceSeries> = requested
            .iter()
            .filter_map(|symbol| {
                fetch_usable(provider, symbol, start, end, ReturnMethod::default())
                    .map(|series| (symbol.clone(), series))
            })
            .collect();

        if stocks.is_empty() {
            return Err(Error::FetchFailure(format!(
                "no price history for any of {}",
                requested.join(", ")
            )));
        }

        let weights = match weights {
            Some(explicit) => {
                let explicit: BTreeMap<String, f64> = explicit
                    .into_iter()
                    .map(|(symbol, w)| (symbol.to_uppercase(), w))
                    .collect();
                if let Some(missing) = stocks.keys().find(|s| !explicit.contains_key(*s)) {
                    return Err(Error::InvalidInput(format!("no weight given for {}", missing)));
                }
                for symbol in explicit.keys().filter(|s| !stocks.contains_key(*s)) {
                    warn!(symbol = %symbol, "dropping weight of instrument without data");
                }
                explicit
                    .into_iter()
                    .filter(|(symbol, _)| stocks.contains_key(symbol))
                    .collect()
            }
            None => {
                let equal = 1.0 / requested.len() as f64;
                stocks.keys().map(|s| (s.clone(), equal)).collect()
            }
        };

        let name = stocks.keys().cloned().collect::<Vec<_>>().join("+");
        info!(portfolio = %name, instruments = stocks.len(), "portfolio created");

        Ok(Self {
            name,
            start,
            end,
            method: ReturnMethod::Simple,
            add_policy: AddPolicy::Preserve,
            stocks,
            weights,
            returns: OnceCell::new(),
        })
    }

    /// Set a display name used in comparisons and reports.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Choose simple or log returns for the return table.
    pub fn with_return_method(mut self, method: ReturnMethod) -> Self {
        self.method = method;
        self.returns = OnceCell::new();
        self
    }

    pub fn with_add_policy(mut self, policy: AddPolicy) -> Self {
        self.add_policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn return_method(&self) -> ReturnMethod {
        self.method
    }

    pub fn add_policy(&self) -> AddPolicy {
        self.add_policy
    }

    /// Instrument symbols in table column order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.stocks.keys().map(String::as_str)
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Weights aligned with the return table's columns.
    pub fn weight_vector(&self) -> Vec<f64> {
        self.weights.values().copied().collect()
    }

    pub fn prices(&self, symbol: &str) -> Option<&PriceSeries> {
        self.stocks.get(&symbol.to_uppercase())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.stocks.contains_key(&symbol.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    fn invalidate(&mut self) {
        self.returns = OnceCell::new();
    }

    /// Scale every weight except `fixed` so that all weights sum to 1.
    fn renormalize(&mut self, fixed: Option<&str>) {
        let fixed_weight = fixed
            .and_then(|s| self.weights.get(s))
            .copied()
            .unwrap_or(0.0);
        let others = self.weights.len() - usize::from(fixed.is_some());

        if others == 0 {
            if let Some(w) = fixed.and_then(|s| self.weights.get_mut(s)) {
                *w = 1.0;
            }
            return;
        }

        let others_sum: f64 = self
            .weights
            .iter()
            .filter(|(s, _)| Some(s.as_str()) != fixed)
            .map(|(_, w)| w)
            .sum();
        let target = 1.0 - fixed_weight;

        for (symbol, w) in self.weights.iter_mut() {
            if Some(symbol.as_str()) == fixed {
                continue;
            }
            *w = if others_sum > 0.0 {
                *w / others_sum * target
            } else {
                target / others as f64
            };
        }
    }

    /// Add an instrument, fetching its history for the portfolio's window.
    ///
    /// Does nothing if the symbol is already held or its fetch yields no usable
    /// data. Without an explicit weight the new instrument gets `1 / len`
    /// after insertion. `Some(0.0)` is an explicit weight: the instrument is
    /// held with weight 0, not given an equal share. See [`AddPolicy`] for what
    /// happens to existing weights.
    ///
    /// Returns whether the instrument was added.
    pub fn add_instrument(
        &mut self,
        provider: &dyn MarketDataProvider,
        symbol: &str,
        weight: Option<f64>,
    ) -> Result<bool> {
        let symbol = symbol.trim().to_uppercase();
        if self.stocks.contains_key(&symbol) {
            debug!(symbol = %symbol, "instrument already in portfolio");
            return Ok(false);
        }

        if self.add_policy == AddPolicy::Renormalize {
            if let Some(w) = weight.filter(|w| !(0.0..=1.0).contains(w)) {
                return Err(Error::InvalidInput(format!(
                    "weight {} for {} must be within [0, 1]",
                    w, symbol
                )));
            }
        }

        let Some(series) = fetch_usable(provider, &symbol, self.start, self.end, self.method) else {
            return Ok(false);
        };

        self.stocks.insert(symbol.clone(), series);
        let weight = weight.unwrap_or(1.0 / self.stocks.len() as f64);
        self.weights.insert(symbol.clone(), weight);

        if self.add_policy == AddPolicy::Renormalize {
            self.renormalize(Some(symbol.as_str()));
        }

        self.invalidate();
        info!(symbol = %symbol, weight = self.weights[&symbol], "instrument added");
        Ok(true)
    }

    /// Remove an instrument and its weight.
    ///
    /// Returns [`Error::NotFound`] and leaves the portfolio unchanged if the
    /// symbol is not held.
    pub fn remove_instrument(&mut self, symbol: &str) -> Result<PriceSeries> {
        let symbol = symbol.trim().to_uppercase();

        let Some(series) = self.stocks.remove(&symbol) else {
            info!(symbol = %symbol, "instrument not found in portfolio");
            return Err(Error::NotFound(symbol));
        };
        self.weights.remove(&symbol);

        if self.add_policy == AddPolicy::Renormalize && !self.weights.is_empty() {
            self.renormalize(None);
        }

        self.invalidate();
        info!(symbol = %symbol, "instrument removed");
        Ok(series)
    }

    /// Replace all weights. The key set must match the held instruments.
    pub fn set_weights(&mut self, weights: BTreeMap<String, f64>) -> Result<()> {
        let weights: BTreeMap<String, f64> = weights
            .into_iter()
            .map(|(symbol, w)| (symbol.to_uppercase(), w))
            .collect();

        if weights.len() != self.stocks.len() || weights.keys().any(|s| !self.stocks.contains_key(s))
        {
            return Err(Error::InvalidInput(format!(
                "weights for [{}] do not match instruments [{}]",
                weights.keys().cloned().collect::<Vec<_>>().join(", "),
                self.stocks.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        }

        self.weights = weights;
        Ok(())
    }

    /// Adopt the weights produced by the optimizer.
    pub fn apply_optimization(&mut self, result: &OptimizationResult) -> Result<()> {
        self.set_weights(result.weights.clone())
    }

    fn build_returns_table(&self) -> Result<DateTable> {
        let series = self
            .stocks
            .values()
            .map(|prices| returns(prices, self.method))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<_> = series.iter().collect();
        let table = DateTable::from_series(&refs);
        debug!(
            portfolio = %self.name,
            rows = table.n_rows(),
            columns = table.n_cols(),
            "built return table"
        );
        Ok(table)
    }

    /// Per-date returns, one column per instrument, on dates shared by all instruments.
    pub fn returns_table(&self) -> Result<&DateTable> {
        if let Some(table) = self.returns.get() {
            return Ok(table);
        }
        let table = self.build_returns_table()?;
        Ok(self.returns.get_or_init(|| table))
    }

    /// Daily portfolio returns: each row of the return table dotted with the weights.
    pub fn weighted_returns(&self) -> Result<Vec<f64>> {
        self.returns_table()?.dot(&self.weight_vector())
    }

    /// Daily portfolio returns paired with their dates.
    pub fn weighted_return_points(&self) -> Result<Vec<(NaiveDate, f64)>> {
        let table = self.returns_table()?;
        let weighted = table.dot(&self.weight_vector())?;
        Ok(table.index().iter().copied().zip(weighted).collect())
    }

    /// Annualized portfolio return: mean weighted daily return times 252.
    pub fn portfolio_return(&self) -> Result<f64> {
        annualized_return(&self.weighted_returns()?)
    }

    /// Annualized portfolio volatility `sqrt(w' Σ w)` from the 252-scaled covariance matrix.
    pub fn portfolio_volatility(&self) -> Result<f64> {
        let cov = annualized_covariance(self.returns_table()?)?;
        portfolio_volatility(&self.weight_vector(), &cov)
    }

    /// Risk summary of the weighted daily return series.
    pub fn risk_report(&self, confidence: f64, risk_free_rate: f64) -> Result<RiskReport> {
        risk_report(&self.weighted_returns()?, confidence, risk_free_rate)
    }
}
