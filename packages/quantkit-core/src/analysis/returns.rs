//! Return series and volatility calculation.

use crate::types::{DateTable, PriceSeries, ReturnMethod, ReturnSeries};
use crate::{Error, Result, TRADING_DAYS};

pub(crate) fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance (n - 1 denominator). `NaN` for fewer than 2 values.
pub(crate) fn sample_variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return f64::NAN;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64
}

pub(crate) fn sample_std(xs: &[f64]) -> f64 {
    sample_variance(xs).sqrt()
}

/// Convert a price series into a return series.
///
/// # Arguments
///
/// * `prices` - Closing prices, at least two points, all positive
/// * `method` - Simple (`p_t / p_{t-1} - 1`) or logarithmic (`ln(p_t / p_{t-1})`)
///
/// # Returns
///
/// One return per price after the first, dated with the later price's date.
pub fn returns(prices: &PriceSeries, method: ReturnMethod) -> Result<ReturnSeries> {
    if prices.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "need at least 2 prices to compute returns for {}, got {}",
            prices.symbol,
            prices.len()
        )));
    }

    if let Some((date, price)) = prices
        .points()
        .iter()
        .find(|(_, p)| !p.is_finite() || *p <= 0.0)
    {
        return Err(Error::InvalidInput(format!(
            "price for {} on {} must be positive, got {}",
            prices.symbol, date, price
        )));
    }

    let points = prices
        .points()
        .windows(2)
        .map(|pair| {
            let (_, prev) = pair[0];
            let (date, curr) = pair[1];
            let r = match method {
                ReturnMethod::Simple => curr / prev - 1.0,
                ReturnMethod::Log => (curr / prev).ln(),
            };
            (date, r)
        })
        .collect();

    Ok(ReturnSeries::from_sorted(
        prices.symbol.clone(),
        method,
        points,
    ))
}

/// Mean daily return annualized over 252 trading days.
pub fn annualized_return(returns: &[f64]) -> Result<f64> {
    if returns.is_empty() {
        return Err(Error::InvalidInput(
            "cannot annualize an empty return series".to_string(),
        ));
    }
    Ok(mean(returns) * TRADING_DAYS)
}

/// Annualized volatility: sample standard deviation of daily returns times sqrt(252).
pub fn volatility(returns: &[f64]) -> Result<f64> {
    if returns.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "need at least 2 returns for volatility, got {}",
            returns.len()
        )));
    }
    Ok(sample_std(returns) * TRADING_DAYS.sqrt())
}

/// Compounded return over the whole series: `prod(1 + r) - 1`.
pub fn cumulative_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Sample covariance matrix of the table's columns.
pub fn covariance_matrix(table: &DateTable) -> Result<Vec<Vec<f64>>> {
    let n_rows = table.n_rows();
    if n_rows < 2 {
        return Err(Error::InvalidInput(format!(
            "need at least 2 rows for covariance, got {}",
            n_rows
        )));
    }

    let columns: Vec<Vec<f64>> = (0..table.n_cols()).map(|j| table.column_at(j)).collect();
    let means: Vec<f64> = columns.iter().map(|c| mean(c)).collect();
    let k = columns.len();
    let mut cov = vec![vec![0.0; k]; k];

    for i in 0..k {
        for j in i..k {
            let acc: f64 = columns[i]
                .iter()
                .zip(&columns[j])
                .map(|(x, y)| (x - means[i]) * (y - means[j]))
                .sum();
            let c = acc / (n_rows - 1) as f64;
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }

    Ok(cov)
}

/// Covariance matrix scaled by 252 trading days.
pub fn annualized_covariance(table: &DateTable) -> Result<Vec<Vec<f64>>> {
    let mut cov = covariance_matrix(table)?;
    for row in cov.iter_mut() {
        for c in row.iter_mut() {
            *c *= TRADING_DAYS;
        }
    }
    Ok(cov)
}

/// Portfolio volatility `sqrt(w' Σ w)`.
///
/// Uses the full covariance matrix, so offsetting instruments lower the result
/// below the weighted average of individual volatilities.
pub fn portfolio_volatility(weights: &[f64], covariance: &[Vec<f64>]) -> Result<f64> {
    if covariance.len() != weights.len() || covariance.iter().any(|row| row.len() != weights.len())
    {
        return Err(Error::InvalidInput(format!(
            "{} weights do not match a {}x{} covariance matrix",
            weights.len(),
            covariance.len(),
            covariance.first().map(|r| r.len()).unwrap_or(0)
        )));
    }
    Ok(quadratic_form(weights, covariance).max(0.0).sqrt())
}

pub(crate) fn quadratic_form(w: &[f64], m: &[Vec<f64>]) -> f64 {
    m.iter()
        .zip(w)
        .map(|(row, wi)| wi * row.iter().zip(w).map(|(c, wj)| c * wj).sum::<f64>())
        .sum()
}
