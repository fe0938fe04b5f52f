//! Moving averages and rolling window statistics.

use crate::analysis::returns::sample_std;

/// Calculate Simple Moving Average.
///
/// # Arguments
///
/// * `data` - Price series
/// * `window` - Lookback period
///
/// # Returns
///
/// One entry per input value. The first `window - 1` entries are `None`.
///
/// # Example
///
/// ```rust
/// use quantkit_core::indicators::sma;
///
/// let prices = vec![100.0, 102.0, 101.0, 105.0, 107.0];
/// let sma_values = sma(&prices, 3);
///
/// assert_eq!(sma_values[1], None);
/// // SMA at index 2 = (100 + 102 + 101) / 3 = 101.0
/// assert!((sma_values[2].unwrap() - 101.0).abs() < 0.001);
/// ```
pub fn sma(data: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = data.len();
    let mut result = vec![None; n];

    if window == 0 || window > n {
        return result;
    }

    // First full window, then slide
    let mut sum: f64 = data[..window].iter().sum();
    result[window - 1] = Some(sum / window as f64);

    for i in window..n {
        sum = sum - data[i - window] + data[i];
        result[i] = Some(sum / window as f64);
    }

    result
}

/// Calculate Exponential Moving Average.
///
/// `EMA[i] = alpha * price[i] + (1 - alpha) * EMA[i-1]` with
/// `alpha = 2 / (span + 1)`, seeded with the first price. There is no warm-up:
/// every position has a value. A span of 0 is treated as 1.
pub fn ema(data: &[f64], span: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(data.len());
    let Some(&first) = data.first() else {
        return result;
    };

    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let mut prev = first;
    result.push(prev);
    for &price in &data[1..] {
        prev = alpha * price + (1.0 - alpha) * prev;
        result.push(prev);
    }

    result
}

/// Rolling mean over `window` values. Same as [`sma`].
pub fn rolling_mean(data: &[f64], window: usize) -> Vec<Option<f64>> {
    sma(data, window)
}

/// Rolling sample standard deviation (n - 1 denominator).
///
/// The first `window - 1` entries are `None`; a window below 2 yields all `None`.
pub fn rolling_std(data: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = data.len();
    let mut result = vec![None; n];

    if window < 2 || window > n {
        return result;
    }

    for i in (window - 1)..n {
        result[i] = Some(sample_std(&data[i + 1 - window..=i]));
    }

    result
}
