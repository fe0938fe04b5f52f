//! Tail risk and drawdown metrics.
//!
//! Provides empirical VaR, CVaR, maximum drawdown and a combined [`RiskReport`].

use super::ratios::{sharpe_ratio_of, sortino_ratio_of};
use super::returns::{annualized_return, volatility};
use crate::types::RiskReport;
use crate::{Error, Result};

fn check_confidence(confidence: f64) -> Result<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "confidence level must be in (0, 1), got {}",
            confidence
        )))
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// `sorted` must be ascending and non-empty, `q` in [0, 1].
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
}

fn sorted_finite(returns: &[f64]) -> Result<Vec<f64>> {
    let mut clean: Vec<f64> = returns.iter().copied().filter(|r| !r.is_nan()).collect();
    if clean.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "need at least 2 returns after removing missing values, got {}",
            clean.len()
        )));
    }
    clean.sort_by(|a, b| a.total_cmp(b));
    Ok(clean)
}

/// Historical Value at Risk.
///
/// # Arguments
///
/// * `returns` - Daily returns; `NaN` entries are ignored
/// * `confidence` - Confidence level in (0, 1), e.g. 0.95
///
/// # Returns
///
/// The (1 - confidence) quantile of the returns. Negative for typical inputs:
/// -0.03 means a 3% daily loss is not exceeded with the given confidence.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> Result<f64> {
    check_confidence(confidence)?;
    let sorted = sorted_finite(returns)?;
    Ok(quantile_sorted(&sorted, 1.0 - confidence))
}

/// Conditional Value at Risk (Expected Shortfall).
///
/// Mean of all returns at or below the VaR threshold. Returns
/// [`Error::UndefinedRatio`] when no return falls in the tail.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> Result<f64> {
    check_confidence(confidence)?;
    let sorted = sorted_finite(returns)?;
    let var = quantile_sorted(&sorted, 1.0 - confidence);

    let tail: Vec<f64> = sorted.iter().copied().take_while(|r| *r <= var).collect();
    if tail.is_empty() {
        return Err(Error::UndefinedRatio(format!(
            "no returns at or below VaR threshold {}",
            var
        )));
    }
    Ok(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Maximum drawdown of a price or portfolio value series.
///
/// Returns `min((value - running_max) / running_max)`, a number in (-1, 0].
/// A series that never falls below its running peak yields exactly 0.
pub fn maximum_drawdown(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::InvalidInput(
            "cannot compute drawdown of an empty series".to_string(),
        ));
    }
    if let Some(v) = values.iter().find(|v| v.is_nan() || **v <= 0.0) {
        return Err(Error::InvalidInput(format!(
            "drawdown requires positive values, got {}",
            v
        )));
    }

    let mut running_max = values[0];
    let mut max_drawdown = 0.0_f64;
    for &value in values {
        if value > running_max {
            running_max = value;
        }
        let drawdown = (value - running_max) / running_max;
        if drawdown < max_drawdown {
            max_drawdown = drawdown;
        }
    }

    Ok(max_drawdown)
}

/// [`maximum_drawdown`] expressed as a percentage (-4.6 for a 4.6% decline).
pub fn maximum_drawdown_percent(values: &[f64]) -> Result<f64> {
    Ok(maximum_drawdown(values)? * 100.0)
}

/// Wealth curve from compounding daily returns, starting at 1.0.
fn wealth_curve(returns: &[f64]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(returns.len() + 1);
    let mut wealth = 1.0;
    curve.push(wealth);
    for r in returns {
        wealth *= 1.0 + r;
        curve.push(wealth);
    }
    curve
}

/// Calculate a full risk summary for one daily return series.
///
/// # Arguments
///
/// * `returns` - Daily returns (e.g., 0.01 for a 1% day), at least 2 points
/// * `confidence` - Confidence level for VaR and CVaR (typically 0.95)
/// * `risk_free_rate` - Annual risk-free rate (e.g., 0.01 for 1%)
///
/// Undefined ratios are reported as `None` rather than failing the report.
pub fn risk_report(returns: &[f64], confidence: f64, risk_free_rate: f64) -> Result<RiskReport> {
    let value_at_risk = value_at_risk(returns, confidence)?;
    let conditional_value_at_risk = conditional_value_at_risk(returns, confidence).ok();

    let max_drawdown = if returns.iter().any(|r| *r <= -1.0) {
        -1.0
    } else {
        maximum_drawdown(&wealth_curve(returns))?
    };

    Ok(RiskReport {
        confidence_level: confidence,
        observations: returns.len(),
        annualized_return: annualized_return(returns)?,
        volatility: volatility(returns)?,
        value_at_risk,
        conditional_value_at_risk,
        max_drawdown,
        sharpe_ratio: sharpe_ratio_of(returns, risk_free_rate).ok(),
        sortino_ratio: sortino_ratio_of(returns, risk_free_rate).ok(),
    })
}
