//! Long-only portfolio weight optimization.
//!
//! Weights are parameterized through a softmax so that every candidate the
//! solver evaluates already satisfies `sum(w) = 1` and `0 <= w_i <= 1`. The
//! unconstrained problem is then solved with Nelder-Mead.

use super::returns::{annualized_covariance, mean, quadratic_form, sample_std};
use crate::portfolio::Portfolio;
use crate::types::{DateTable, Objective, OptimizationResult};
use crate::{Error, Result, TRADING_DAYS};
use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;
use tracing::{debug, info};

const MAX_ITERS: u64 = 5000;
const SD_TOLERANCE: f64 = 1e-8;

/// Standard deviations below this are treated as zero.
const MIN_STD: f64 = 1e-15;

fn softmax(x: &[f64]) -> Vec<f64> {
    if x.is_empty() {
        return Vec::new();
    }

    let max_x = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
    let sum: f64 = exps.iter().sum();

    if sum < MIN_STD {
        vec![1.0 / x.len() as f64; x.len()]
    } else {
        exps.iter().map(|&e| e / sum).collect()
    }
}

fn weighted_rows(rows: &[Vec<f64>], w: &[f64]) -> Vec<f64> {
    rows.iter()
        .map(|row| row.iter().zip(w).map(|(r, w)| r * w).sum())
        .collect()
}

/// Negated daily Sharpe ratio of the weighted return series.
fn negated_sharpe(rows: &[Vec<f64>], rf_daily: f64, w: &[f64]) -> f64 {
    let series = weighted_rows(rows, w);
    let std = sample_std(&series);
    if std.is_nan() || std < MIN_STD {
        return 0.0;
    }
    -(mean(&series) - rf_daily) / std
}

/// Annualized portfolio volatility `sqrt(w' Σ w)`.
fn portfolio_std(cov: &[Vec<f64>], w: &[f64]) -> f64 {
    quadratic_form(w, cov).max(0.0).sqrt()
}

struct SharpeCost {
    rows: Vec<Vec<f64>>,
    rf_daily: f64,
}

impl CostFunction for SharpeCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        Ok(negated_sharpe(&self.rows, self.rf_daily, &softmax(x)))
    }
}

struct VolatilityCost {
    cov: Vec<Vec<f64>>,
}

impl CostFunction for VolatilityCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        Ok(portfolio_std(&self.cov, &softmax(x)))
    }
}

/// Initial simplex around the origin, which softmax maps to equal weights.
fn initial_simplex(n: usize) -> Vec<Vec<f64>> {
    let x0 = vec![0.0; n];
    let mut simplex = Vec::with_capacity(n + 1);
    simplex.push(x0.clone());
    for i in 0..n {
        let mut point = x0.clone();
        point[i] = 1.0;
        simplex.push(point);
    }
    simplex
}

/// Run Nelder-Mead and return the best weights and iteration count.
fn minimize<C>(cost: C, n: usize) -> Result<(Vec<f64>, u64)>
where
    C: CostFunction<Param = Vec<f64>, Output = f64>,
{
    let solver = NelderMead::new(initial_simplex(n))
        .with_sd_tolerance(SD_TOLERANCE)
        .map_err(|e| Error::Optimization(e.to_string()))?;

    let res = Executor::new(cost, solver)
        .configure(|state| state.max_iters(MAX_ITERS))
        .run()
        .map_err(|e| Error::Optimization(e.to_string()))?;

    let iterations = res.state.get_iter();
    let best = res.state.best_param.unwrap_or_else(|| vec![0.0; n]);
    Ok((softmax(&best), iterations))
}

/// Optimize weights for the columns of a return table.
///
/// # Arguments
///
/// * `table` - Daily returns, one column per instrument, at least 2 rows
/// * `objective` - Maximize Sharpe or minimize volatility
///
/// # Returns
///
/// Weights keyed by column name, each in [0, 1] and summing to 1. The solver
/// starts from equal weights; the result is a local optimum and need not be
/// unique.
pub fn optimize_table(table: &DateTable, objective: Objective) -> Result<OptimizationResult> {
    let n = table.n_cols();
    if n == 0 {
        return Err(Error::InvalidInput(
            "cannot optimize a portfolio without instruments".to_string(),
        ));
    }
    if table.n_rows() < 2 {
        return Err(Error::InvalidInput(format!(
            "need at least 2 return rows to optimize, got {}",
            table.n_rows()
        )));
    }

    let (weights, objective_value, iterations) = match objective {
        Objective::MaxSharpe { risk_free_rate } => {
            let rf_daily = risk_free_rate / TRADING_DAYS;
            let (w, iters) = if n == 1 {
                (vec![1.0], 0)
            } else {
                let cost = SharpeCost {
                    rows: table.rows().to_vec(),
                    rf_daily,
                };
                minimize(cost, n)?
            };
            let value = negated_sharpe(table.rows(), rf_daily, &w);
            (w, value, iters)
        }
        Objective::MinVolatility => {
            let cov = annualized_covariance(table)?;
            let (w, iters) = if n == 1 {
                (vec![1.0], 0)
            } else {
                minimize(VolatilityCost { cov: cov.clone() }, n)?
            };
            let value = portfolio_std(&cov, &w);
            (w, value, iters)
        }
    };

    debug!(?weights, iterations, "optimizer finished");

    Ok(OptimizationResult {
        objective,
        weights: table.columns().iter().cloned().zip(weights).collect(),
        objective_value,
        iterations,
    })
}

/// Optimize a portfolio's weights over its return table.
///
/// The portfolio itself is left unchanged; pass the result to
/// [`Portfolio::apply_optimization`] to adopt it.
pub fn optimize(portfolio: &Portfolio, objective: Objective) -> Result<OptimizationResult> {
    let result = optimize_table(portfolio.returns_table()?, objective)?;
    info!(
        portfolio = %portfolio.name(),
        objective = ?result.objective,
        value = result.objective_value,
        iterations = result.iterations,
        "optimized weights"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticProvider;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn table(columns: &[&str], data: &[Vec<f64>]) -> DateTable {
        let n_rows = data[0].len();
        let rows = (0..n_rows)
            .map(|i| data.iter().map(|col| col[i]).collect())
            .collect();
        DateTable::new(
            (0..n_rows as u32).map(|i| day(i + 2)).collect(),
            columns.iter().map(|c| c.to_string()).collect(),
            rows,
        )
        .unwrap()
    }

    // Zero-mean patterns with zero sample covariance between them
    const ALT: [f64; 8] = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
    const PAIRS: [f64; 8] = [1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0];

    fn scaled(pattern: &[f64], shift: f64, scale: f64) -> Vec<f64> {
        pattern.iter().map(|p| shift + scale * p).collect()
    }

    fn assert_valid_weights(result: &OptimizationResult) {
        let total: f64 = result.weights.values().sum();
        assert!((total - 1.0).abs() < 1e-4, "weights sum to {}", total);
        for w in result.weights.values() {
            assert!((0.0..=1.0).contains(w), "weight {} out of bounds", w);
        }
    }

    #[test]
    fn test_softmax() {
        assert_eq!(softmax(&[0.0, 0.0]), vec![0.5, 0.5]);
        let w = softmax(&[1000.0, 0.0, -3.0]);
        assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(w[0] > 0.99);
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_min_volatility_favors_low_volatility() {
        let t = table(
            &["BOND", "STOCK"],
            &[scaled(&ALT, 0.0, 0.001), scaled(&PAIRS, 0.0, 0.02)],
        );
        let result = optimize_table(&t, Objective::MinVolatility).unwrap();

        assert_valid_weights(&result);
        assert!(result.weights["BOND"] > 0.95);
        assert!(result.iterations > 0);
        assert!(result.objective_value >= 0.0);
    }

    #[test]
    fn test_min_volatility_hedged_pair() {
        let t = table(
            &["LONG", "SHORT"],
            &[scaled(&ALT, 0.0, 0.01), scaled(&ALT, 0.0, -0.01)],
        );
        let result = optimize_table(&t, Objective::MinVolatility).unwrap();

        assert_valid_weights(&result);
        assert_abs_diff_eq!(result.weights["LONG"], 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(result.objective_value, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_max_sharpe_favors_better_asset() {
        let t = table(
            &["GOOD", "POOR"],
            &[scaled(&ALT, 0.002, 0.01), scaled(&PAIRS, -0.001, 0.01)],
        );
        let result = optimize_table(&t, Objective::MaxSharpe { risk_free_rate: 0.01 }).unwrap();

        assert_valid_weights(&result);
        assert!(result.weights["GOOD"] > 0.9);
        // Cost is the negated Sharpe ratio
        assert!(result.objective_value < 0.0);
    }

    #[test]
    fn test_single_instrument() {
        let t = table(&["ONLY"], &[vec![0.01, -0.02, 0.015]]);
        let result = optimize_table(&t, Objective::MinVolatility).unwrap();

        assert_eq!(result.weights["ONLY"], 1.0);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_max_sharpe_uses_daily_risk_free_rate() {
        let daily = vec![0.01, -0.02, 0.015];
        let t = table(&["ONLY"], &[daily.clone()]);
        let result = optimize_table(&t, Objective::MaxSharpe { risk_free_rate: 0.0252 }).unwrap();

        let expected = -(mean(&daily) - 0.0001) / sample_std(&daily);
        assert_abs_diff_eq!(result.objective_value, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_not_enough_data() {
        let t = table(&["A", "B"], &[vec![0.01], vec![0.02]]);
        assert!(matches!(
            optimize_table(&t, Objective::MinVolatility),
            Err(Error::InvalidInput(_))
        ));

        assert!(matches!(
            optimize_table(&DateTable::default(), Objective::MinVolatility),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_optimize_portfolio() {
        let provider = StaticProvider::new()
            .with_prices("AAPL", day(1), &[100.0, 102.0, 101.0, 103.0, 104.0, 103.0, 105.0])
            .with_prices("MSFT", day(1), &[50.0, 49.0, 51.0, 50.0, 52.0, 53.0, 52.0])
            .with_prices("GOOG", day(1), &[20.0, 20.5, 20.2, 20.8, 21.0, 20.7, 21.2]);
        let mut portfolio =
            Portfolio::new(&provider, &["AAPL", "MSFT", "GOOG"], day(1), day(31), None).unwrap();
        let before = portfolio.portfolio_volatility().unwrap();

        let result = optimize(&portfolio, Objective::MinVolatility).unwrap();
        assert_valid_weights(&result);
        assert_eq!(
            result.weights.keys().collect::<Vec<_>>(),
            vec!["AAPL", "GOOG", "MSFT"]
        );

        portfolio.apply_optimization(&result).unwrap();
        let after = portfolio.portfolio_volatility().unwrap();
        assert!(after <= before + 1e-12);
        assert_abs_diff_eq!(after, result.objective_value, epsilon = 1e-9);
    }
}
