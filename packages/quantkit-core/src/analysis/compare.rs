//! Side-by-side comparison of several portfolios.
//!
//! Each comparison refetches every constituent's prices for the requested
//! window, computes per-instrument statistics and folds them into one number
//! per portfolio. [`Weighting::Sum`] adds the per-instrument figures as they
//! are; [`Weighting::Portfolio`] scales each by the instrument's weight.

use super::returns::{cumulative_return, mean, returns, sample_std};
use crate::portfolio::Portfolio;
use crate::provider::MarketDataProvider;
use crate::types::ReturnMethod;
use crate::{Error, Result, TRADING_DAYS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Sector label used when a company reports none.
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// How per-instrument figures are combined into a portfolio figure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Plain sum over instruments
    #[default]
    Sum,
    /// Sum scaled by each instrument's portfolio weight
    Portfolio,
}

/// One portfolio's figure in a comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonRow {
    pub portfolio: String,
    /// `None` when the figure is undefined (e.g. zero volatility)
    pub value: Option<f64>,
}

/// Instrument counts per sector, one column per portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CompositionTable {
    /// Portfolio names in input order
    pub portfolios: Vec<String>,
    /// Sector to per-portfolio instrument count, aligned with `portfolios`
    pub sectors: BTreeMap<String, Vec<usize>>,
}

impl CompositionTable {
    /// Count of instruments in `sector` for the portfolio at `portfolio_idx`.
    pub fn count(&self, sector: &str, portfolio_idx: usize) -> usize {
        self.sectors
            .get(sector)
            .and_then(|counts| counts.get(portfolio_idx))
            .copied()
            .unwrap_or(0)
    }
}

/// Daily simple returns of every constituent with usable data, paired with
/// the factor its statistics are scaled by.
fn constituent_returns(
    portfolio: &Portfolio,
    provider: &dyn MarketDataProvider,
    start: NaiveDate,
    end: NaiveDate,
    weighting: Weighting,
) -> Vec<(f64, Vec<f64>)> {
    portfolio
        .symbols()
        .filter_map(|symbol| {
            let prices = provider.fetch_history(symbol, start, end);
            if prices.len() < 2 {
                debug!(symbol, "no data for comparison window");
                return None;
            }
            match returns(&prices, ReturnMethod::Simple) {
                Ok(series) => {
                    let factor = match weighting {
                        Weighting::Sum => 1.0,
                        Weighting::Portfolio => {
                            portfolio.weights().get(symbol).copied().unwrap_or(0.0)
                        }
                    };
                    Some((factor, series.values()))
                }
                Err(e) => {
                    warn!(symbol, error = %e, "skipping instrument in comparison");
                    None
                }
            }
        })
        .collect()
}

/// Weighted sum of a per-instrument statistic.
fn aggregate(items: &[(f64, Vec<f64>)], stat: impl Fn(&[f64]) -> f64) -> f64 {
    items.iter().map(|(factor, r)| factor * stat(r)).sum()
}

fn check_window(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start >= end {
        return Err(Error::InvalidInput(format!(
            "start date {} must be before end date {}",
            start, end
        )));
    }
    Ok(())
}

fn compare_with<F>(
    portfolios: &[&Portfolio],
    provider: &dyn MarketDataProvider,
    start: NaiveDate,
    end: NaiveDate,
    weighting: Weighting,
    figure: F,
) -> Result<Vec<ComparisonRow>>
where
    F: Fn(&[(f64, Vec<f64>)]) -> Option<f64>,
{
    check_window(start, end)?;
    Ok(portfolios
        .iter()
        .map(|portfolio| {
            let items = constituent_returns(portfolio, provider, start, end, weighting);
            ComparisonRow {
                portfolio: portfolio.name().to_string(),
                value: figure(&items),
            }
        })
        .collect())
}

/// Cumulative return `prod(1 + r) - 1` per instrument, aggregated per portfolio.
pub fn compare_returns(
    portfolios: &[&Portfolio],
    provider: &dyn MarketDataProvider,
    start: NaiveDate,
    end: NaiveDate,
    weighting: Weighting,
) -> Result<Vec<ComparisonRow>> {
    compare_with(portfolios, provider, start, end, weighting, |items| {
        Some(aggregate(items, cumulative_return))
    })
}

/// Daily return standard deviation per instrument, aggregated per portfolio.
pub fn compare_volatility(
    portfolios: &[&Portfolio],
    provider: &dyn MarketDataProvider,
    start: NaiveDate,
    end: NaiveDate,
    weighting: Weighting,
) -> Result<Vec<ComparisonRow>> {
    compare_with(portfolios, provider, start, end, weighting, |items| {
        Some(aggregate(items, sample_std))
    })
}

/// Sharpe ratio from aggregated daily means and standard deviations:
/// `(sum(mean) - rf / 252) / sum(std)`. `None` when the aggregated standard
/// deviation is zero.
pub fn compare_sharpe_ratios(
    portfolios: &[&Portfolio],
    provider: &dyn MarketDataProvider,
    start: NaiveDate,
    end: NaiveDate,
    weighting: Weighting,
    risk_free_rate: f64,
) -> Result<Vec<ComparisonRow>> {
    let rf_daily = risk_free_rate / TRADING_DAYS;
    compare_with(portfolios, provider, start, end, weighting, |items| {
        let mean_sum = aggregate(items, mean);
        let std_sum = aggregate(items, sample_std);
        if std_sum.is_nan() || std_sum.abs() < 1e-15 {
            None
        } else {
            Some((mean_sum - rf_daily) / std_sum)
        }
    })
}

/// Count each portfolio's instruments by sector.
///
/// Instruments without company info are left out; an empty sector is
/// reported as [`UNKNOWN_SECTOR`]. Sectors a portfolio does not hold count 0.
pub fn compare_compositions(
    portfolios: &[&Portfolio],
    provider: &dyn MarketDataProvider,
) -> CompositionTable {
    let mut table = CompositionTable {
        portfolios: portfolios.iter().map(|p| p.name().to_string()).collect(),
        sectors: BTreeMap::new(),
    };

    for (idx, portfolio) in portfolios.iter().enumerate() {
        for symbol in portfolio.symbols() {
            let Some(info) = provider.fetch_company_info(symbol) else {
                debug!(symbol, "no company info, leaving out of composition");
                continue;
            };
            let sector = if info.sector.trim().is_empty() {
                UNKNOWN_SECTOR.to_string()
            } else {
                info.sector
            };
            let counts = table
                .sectors
                .entry(sector)
                .or_insert_with(|| vec![0; portfolios.len()]);
            counts[idx] += 1;
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticProvider;
    use crate::types::CompanyInfo;
    use approx::assert_abs_diff_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn info(sector: &str) -> CompanyInfo {
        CompanyInfo {
            sector: sector.to_string(),
            ..Default::default()
        }
    }

    fn provider() -> StaticProvider {
        StaticProvider::new()
            .with_prices("AAPL", day(1), &[100.0, 110.0, 121.0])
            .with_prices("MSFT", day(1), &[100.0, 95.0, 100.0])
            .with_prices("XOM", day(1), &[50.0, 50.0, 50.0])
            .with_company_info("AAPL", info("Technology"))
            .with_company_info("MSFT", info("Technology"))
            .with_company_info("XOM", info(""))
    }

    fn portfolios(p: &StaticProvider) -> (Portfolio, Portfolio) {
        let tech = Portfolio::new(p, &["AAPL", "MSFT"], day(1), day(31), None)
            .unwrap()
            .with_name("tech");
        let energy = Portfolio::new(p, &["XOM"], day(1), day(31), None)
            .unwrap()
            .with_name("energy");
        (tech, energy)
    }

    #[test]
    fn test_compare_returns_sum() {
        let p = provider();
        let (tech, energy) = portfolios(&p);

        let rows = compare_returns(&[&tech, &energy], &p, day(1), day(31), Weighting::Sum).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].portfolio, "tech");
        // AAPL +21%, MSFT 0%
        assert_abs_diff_eq!(rows[0].value.unwrap(), 0.21, epsilon = 1e-12);
        assert_eq!(rows[1].value, Some(0.0));
    }

    #[test]
    fn test_compare_returns_weighted() {
        let p = provider();
        let (tech, _) = portfolios(&p);

        let rows = compare_returns(&[&tech], &p, day(1), day(31), Weighting::Portfolio).unwrap();
        assert_abs_diff_eq!(rows[0].value.unwrap(), 0.105, epsilon = 1e-12);
    }

    #[test]
    fn test_compare_volatility() {
        let p = provider();
        let (tech, energy) = portfolios(&p);

        let rows =
            compare_volatility(&[&tech, &energy], &p, day(1), day(31), Weighting::Sum).unwrap();

        let aapl = sample_std(&[0.1, 0.1]);
        let msft = sample_std(&[-0.05, 100.0 / 95.0 - 1.0]);
        assert_abs_diff_eq!(rows[0].value.unwrap(), aapl + msft, epsilon = 1e-12);
        assert_eq!(rows[1].value, Some(0.0));
    }

    #[test]
    fn test_compare_sharpe_ratios() {
        let p = provider();
        let (tech, energy) = portfolios(&p);

        let rows =
            compare_sharpe_ratios(&[&tech, &energy], &p, day(1), day(31), Weighting::Sum, 0.01)
                .unwrap();

        let msft = [-0.05, 100.0 / 95.0 - 1.0];
        let expected = (0.1 + mean(&msft) - 0.01 / 252.0) / sample_std(&msft);
        assert_abs_diff_eq!(rows[0].value.unwrap(), expected, epsilon = 1e-12);
        // Flat prices: no volatility, ratio undefined
        assert_eq!(rows[1].value, None);
    }

    #[test]
    fn test_window_outside_data() {
        let p = provider();
        let (tech, _) = portfolios(&p);

        let rows = compare_returns(&[&tech], &p, day(20), day(31), Weighting::Sum).unwrap();
        assert_eq!(rows[0].value, Some(0.0));

        assert!(matches!(
            compare_returns(&[&tech], &p, day(31), day(1), Weighting::Sum),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_compare_compositions() {
        let p = provider();
        let (tech, energy) = portfolios(&p);

        let table = compare_compositions(&[&tech, &energy], &p);

        assert_eq!(table.portfolios, vec!["tech", "energy"]);
        assert_eq!(table.sectors["Technology"], vec![2, 0]);
        assert_eq!(table.sectors[UNKNOWN_SECTOR], vec![0, 1]);
        assert_eq!(table.count("Technology", 1), 0);
        assert_eq!(table.count("Utilities", 0), 0);
    }

    #[test]
    fn test_compositions_skip_missing_info() {
        let p = provider().with_prices("GOOG", day(1), &[10.0, 11.0]);
        let portfolio = Portfolio::new(&p, &["GOOG", "AAPL"], day(1), day(31), None).unwrap();

        let table = compare_compositions(&[&portfolio], &p);
        assert_eq!(table.sectors.len(), 1);
        assert_eq!(table.count("Technology", 0), 1);
    }
}
