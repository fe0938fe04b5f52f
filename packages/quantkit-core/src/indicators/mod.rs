//! Technical indicators over daily prices and volume.
//!
//! - **SMA / EMA**: simple and exponential moving averages
//! - **RSI**: Relative Strength Index
//! - **MACD**: Moving Average Convergence Divergence
//! - **Bollinger Bands**: moving average with standard deviation bands
//! - **Stochastic oscillator**: %K and %D over daily highs and lows
//! - **OBV / VPT**: On-Balance Volume and Volume-Price Trend
//! - **Rolling metrics**: rolling mean and standard deviation
//!
//! Entries that need more history than is available are `None`.

mod rsi;
mod sma;
mod stochastic;
mod volume;

pub use rsi::rsi;
pub use sma::{ema, rolling_mean, rolling_std, sma};
pub use stochastic::{stochastic_oscillator, Stochastic};
pub use volume::{obv, vpt};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Statistic computed by [`rolling`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RollingMetric {
    Mean,
    Std,
}

impl FromStr for RollingMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "std" => Ok(Self::Std),
            other => Err(Error::InvalidInput(format!(
                "unknown rolling metric {:?}, expected \"mean\" or \"std\"",
                other
            ))),
        }
    }
}

/// Rolling mean or standard deviation over `window` values.
pub fn rolling(data: &[f64], metric: RollingMetric, window: usize) -> Vec<Option<f64>> {
    match metric {
        RollingMetric::Mean => rolling_mean(data, window),
        RollingMetric::Std => rolling_std(data, window),
    }
}

/// Bollinger Bands result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BollingerBands {
    /// Upper band (middle + num_std * std)
    pub upper: Vec<Option<f64>>,
    /// Middle band (SMA)
    pub middle: Vec<Option<f64>>,
    /// Lower band (middle - num_std * std)
    pub lower: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands.
///
/// # Arguments
///
/// * `data` - Price series
/// * `window` - Lookback period (typically 20)
/// * `num_std` - Number of sample standard deviations (typically 2.0)
pub fn bollinger_bands(data: &[f64], window: usize, num_std: f64) -> BollingerBands {
    let middle = sma(data, window);
    let std = rolling_std(data, window);

    let band = |sign: f64| -> Vec<Option<f64>> {
        middle
            .iter()
            .zip(&std)
            .map(|(m, s)| Some((*m)? + sign * num_std * (*s)?))
            .collect()
    };
    let upper = band(1.0);
    let lower = band(-1.0);

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// MACD (Moving Average Convergence Divergence) result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Macd {
    /// MACD line (fast EMA - slow EMA)
    pub macd_line: Vec<f64>,
    /// Signal line (EMA of MACD line)
    pub signal_line: Vec<f64>,
    /// Histogram (MACD - Signal)
    pub histogram: Vec<f64>,
}

/// Calculate MACD indicator.
///
/// # Arguments
///
/// * `data` - Price series
/// * `fast` - Fast EMA span (typically 12)
/// * `slow` - Slow EMA span (typically 26)
/// * `signal` - Signal line EMA span (typically 9)
pub fn macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(data, fast);
    let slow_ema = ema(data, slow);

    let macd_line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd_line, signal);
    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Macd {
        macd_line,
        signal_line,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bollinger_bands() {
        let data: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64) * 0.5).collect();
        let bb = bollinger_bands(&data, 20, 2.0);

        assert_eq!(bb.middle.len(), 30);
        assert!(bb.middle[18].is_none());
        assert!(bb.upper[18].is_none());

        let (upper, middle, lower) = (
            bb.upper[25].unwrap(),
            bb.middle[25].unwrap(),
            bb.lower[25].unwrap(),
        );
        assert!(upper > middle);
        assert!(lower < middle);
        assert_abs_diff_eq!(upper - middle, middle - lower, epsilon = 1e-9);
    }

    #[test]
    fn test_bollinger_bands_flat_prices() {
        let bb = bollinger_bands(&[10.0; 5], 3, 2.0);
        assert_eq!(bb.upper[4], Some(10.0));
        assert_eq!(bb.lower[4], Some(10.0));
    }

    #[test]
    fn test_macd() {
        let data: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64).sin() * 5.0).collect();
        let result = macd(&data, 12, 26, 9);

        assert_eq!(result.macd_line.len(), 50);
        assert_eq!(result.signal_line.len(), 50);
        assert_eq!(result.histogram.len(), 50);
        assert_abs_diff_eq!(
            result.histogram[49],
            result.macd_line[49] - result.signal_line[49],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_macd_rising_prices() {
        let data: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let result = macd(&data, 12, 26, 9);

        // Fast EMA tracks a rising series more closely than the slow one
        assert_eq!(result.macd_line[0], 0.0);
        assert!(result.macd_line[39] > 0.0);
    }

    #[test]
    fn test_rolling_metric() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!("Mean".parse::<RollingMetric>().unwrap(), RollingMetric::Mean);
        assert!(matches!(
            "median".parse::<RollingMetric>(),
            Err(Error::InvalidInput(_))
        ));

        assert_eq!(
            rolling(&data, RollingMetric::Mean, 2),
            vec![None, Some(1.5), Some(2.5), Some(3.5)]
        );
        let std = rolling(&data, RollingMetric::Std, 2);
        assert_abs_diff_eq!(std[1].unwrap(), 0.5f64.sqrt(), epsilon = 1e-12);
    }
}
