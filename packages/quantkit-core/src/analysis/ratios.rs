//! Risk-adjusted return ratios.

use super::returns::{annualized_return, sample_std, volatility};
use crate::portfolio::Portfolio;
use crate::{Error, Result, TRADING_DAYS};

/// Volatilities below this are treated as zero.
const MIN_DENOMINATOR: f64 = 1e-15;

fn ratio(excess: f64, denominator: f64, what: &str) -> Result<f64> {
    if !denominator.is_finite() || denominator < MIN_DENOMINATOR {
        return Err(Error::UndefinedRatio(format!(
            "{} is zero or undefined ({})",
            what, denominator
        )));
    }
    Ok(excess / denominator)
}

/// Annualized downside deviation: sample std of the strictly negative returns
/// times sqrt(252).
fn downside_deviation(returns: &[f64]) -> Result<f64> {
    let negatives: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if negatives.len() < 2 {
        return Err(Error::UndefinedRatio(format!(
            "downside deviation needs at least 2 negative returns, got {}",
            negatives.len()
        )));
    }
    Ok(sample_std(&negatives) * TRADING_DAYS.sqrt())
}

/// Sharpe ratio of a daily return series.
///
/// # Arguments
///
/// * `returns` - Daily returns
/// * `risk_free_rate` - Annual risk-free rate
///
/// # Returns
///
/// `(annualized_return - risk_free_rate) / volatility`, or
/// [`Error::UndefinedRatio`] when volatility is zero.
pub fn sharpe_ratio_of(returns: &[f64], risk_free_rate: f64) -> Result<f64> {
    let excess = annualized_return(returns)? - risk_free_rate;
    ratio(excess, volatility(returns)?, "volatility")
}

/// Sortino ratio of a daily return series.
///
/// Same numerator as [`sharpe_ratio_of`]; the denominator only uses the
/// strictly negative returns. Fewer than two losing days, or losses that are
/// all equal, give [`Error::UndefinedRatio`].
pub fn sortino_ratio_of(returns: &[f64], risk_free_rate: f64) -> Result<f64> {
    let excess = annualized_return(returns)? - risk_free_rate;
    ratio(excess, downside_deviation(returns)?, "downside deviation")
}

/// Sharpe ratio of a portfolio: `(portfolio_return - rf) / portfolio_volatility`.
pub fn sharpe_ratio(portfolio: &Portfolio, risk_free_rate: f64) -> Result<f64> {
    let excess = portfolio.portfolio_return()? - risk_free_rate;
    ratio(excess, portfolio.portfolio_volatility()?, "portfolio volatility")
}

/// Sortino ratio of a portfolio's weighted daily returns.
pub fn sortino_ratio(portfolio: &Portfolio, risk_free_rate: f64) -> Result<f64> {
    let weighted = portfolio.weighted_returns()?;
    let excess = portfolio.portfolio_return()? - risk_free_rate;
    ratio(excess, downside_deviation(&weighted)?, "downside deviation")
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

    #[test]
    fn test_sharpe_ratio_sign() {
        // Positive returns with low volatility give a positive Sharpe
        let good = [0.01, 0.005, 0.008, 0.012, 0.006];
        assert!(sharpe_ratio_of(&good, 0.04).unwrap() > 0.0);

        // Negative returns give a negative Sharpe
        let bad = [-0.01, -0.005, -0.008, -0.012, -0.006];
        assert!(sharpe_ratio_of(&bad, 0.04).unwrap() < 0.0);
    }

    #[test]
    fn test_sharpe_ratio_value() {
        let returns = [0.01, -0.01, 0.02, 0.0];
        let expected =
            (annualized_return(&returns).unwrap() - 0.01) / volatility(&returns).unwrap();
        assert_abs_diff_eq!(
            sharpe_ratio_of(&returns, 0.01).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_constant_returns_are_undefined() {
        let flat = [0.01, 0.01, 0.01, 0.01];
        assert!(matches!(
            sharpe_ratio_of(&flat, 0.01),
            Err(Error::UndefinedRatio(_))
        ));
    }

    #[test]
    fn test_sortino_ratio() {
        let returns = [0.02, -0.01, 0.03, -0.02, 0.01];
        let downside = sample_std(&[-0.01, -0.02]) * TRADING_DAYS.sqrt();
        let expected = (annualized_return(&returns).unwrap() - 0.01) / downside;

        let sortino = sortino_ratio_of(&returns, 0.01).unwrap();
        assert_abs_diff_eq!(sortino, expected, epsilon = 1e-12);
        // Fewer losing days than total days: Sortino exceeds Sharpe here
        assert!(sortino > sharpe_ratio_of(&returns, 0.01).unwrap());
    }

    #[test]
    fn test_sortino_without_losses_is_undefined() {
        let all_positive = [0.01, 0.02, 0.005, 0.015];
        assert!(matches!(
            sortino_ratio_of(&all_positive, 0.01),
            Err(Error::UndefinedRatio(_))
        ));

        let one_loss = [0.01, -0.02, 0.005];
        assert!(matches!(
            sortino_ratio_of(&one_loss, 0.01),
            Err(Error::UndefinedRatio(_))
        ));
    }

    #[test]
    fn test_portfolio_ratios() {
        let provider = StaticProvider::new()
            .with_prices("AAPL", day(1), &[100.0, 102.0, 101.0, 103.0, 102.0, 105.0])
            .with_prices("MSFT", day(1), &[50.0, 50.5, 49.0, 51.0, 50.0, 52.0]);
        let portfolio =
            Portfolio::new(&provider, &["AAPL", "MSFT"], day(1), day(31), None).unwrap();

        let sharpe = sharpe_ratio(&portfolio, 0.01).unwrap();
        let expected = (portfolio.portfolio_return().unwrap() - 0.01)
            / portfolio.portfolio_volatility().unwrap();
        assert_abs_diff_eq!(sharpe, expected, epsilon = 1e-12);

        let weighted = portfolio.weighted_returns().unwrap();
        assert_abs_diff_eq!(
            sortino_ratio(&portfolio, 0.01).unwrap(),
            sortino_ratio_of(&weighted, 0.01).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_flat_portfolio_is_undefined() {
        let provider = StaticProvider::new().with_prices("CASH", day(1), &[1.0, 1.0, 1.0, 1.0]);
        let portfolio = Portfolio::new(&provider, &["CASH"], day(1), day(31), None).unwrap();

        assert!(matches!(
            sharpe_ratio(&portfolio, 0.01),
            Err(Error::UndefinedRatio(_))
        ));
        assert!(matches!(
            sortino_ratio(&portfolio, 0.01),
            Err(Error::UndefinedRatio(_))
        ));
    }
}
