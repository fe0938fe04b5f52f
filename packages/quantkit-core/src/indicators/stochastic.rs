//! Stochastic oscillator.

use serde::{Deserialize, Serialize};

/// Stochastic oscillator result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stochastic {
    /// %K: close relative to the high-low range of the window, 0-100
    pub k: Vec<Option<f64>>,
    /// %D: simple moving average of %K
    pub d: Vec<Option<f64>>,
}

/// Calculate the stochastic oscillator.
///
/// `%K = 100 * (close - lowest low) / (highest high - lowest low)` over the
/// last `window` bars, `%D` is the mean of the last `signal_window` %K values.
///
/// # Arguments
///
/// * `highs`, `lows`, `closes` - Daily bars; extra values in longer slices are ignored
/// * `window` - Lookback period for %K (typically 14)
/// * `signal_window` - Period of the %D average (typically 3)
///
/// # Returns
///
/// %K is `None` during warm-up and where the window's high equals its low.
/// %D is `None` unless all %K values it averages are present.
pub fn stochastic_oscillator(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    window: usize,
    signal_window: usize,
) -> Stochastic {
    let n = highs.len().min(lows.len()).min(closes.len());
    let mut k = vec![None; n];

    if window > 0 && window <= n {
        for i in (window - 1)..n {
            let span = i + 1 - window..=i;
            let lowest = lows[span.clone()].iter().copied().fold(f64::INFINITY, f64::min);
            let highest = highs[span].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = highest - lowest;
            if range > 0.0 {
                k[i] = Some(100.0 * (closes[i] - lowest) / range);
            }
        }
    }

    let mut d = vec![None; n];
    if signal_window > 0 && signal_window <= n {
        for i in (signal_window - 1)..n {
            let values: Option<Vec<f64>> = k[i + 1 - signal_window..=i].iter().copied().collect();
            d[i] = values.map(|v| v.iter().sum::<f64>() / signal_window as f64);
        }
    }

    Stochastic { k, d }
}
