//! Relative Strength Index (RSI) indicator.

/// Calculate RSI value from average gain and average loss.
/// Handles edge cases: no losses (RSI=100), no gains (RSI=0), no change (RSI=50).
#[inline]
fn calculate_rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        if avg_gain <= 0.0 {
            50.0
        } else {
            100.0
        }
    } else if avg_gain <= 0.0 {
        0.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}

/// Calculate Relative Strength Index.
///
/// Average gain and average loss are plain means of the last `window` price
/// changes, then `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`.
///
/// # Arguments
///
/// * `prices` - Closing prices
/// * `window` - Number of price changes averaged (typically 14)
///
/// # Returns
///
/// One entry per price on a 0-100 scale. The first `window` entries are
/// `None` since `window` changes need `window + 1` prices. Counting the
/// undefined change into the first price as a zero move would give a value
/// one position earlier; that value averages only `window - 1` real changes,
/// so it is not produced here.
pub fn rsi(prices: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = prices.len();
    let mut result = vec![None; n];

    if window == 0 || n <= window {
        return result;
    }

    // changes[k] is the move into prices[k + 1]
    let (gains, losses): (Vec<f64>, Vec<f64>) = prices
        .windows(2)
        .map(|pair| {
            let change = pair[1] - pair[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    for i in window..n {
        let span = i - window..i;
        let avg_gain = gains[span.clone()].iter().sum::<f64>() / window as f64;
        let avg_loss = losses[span].iter().sum::<f64>() / window as f64;
        result[i] = Some(calculate_rsi_value(avg_gain, avg_loss));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rsi_values() {
        let closes = [100.0, 102.0, 101.0, 105.0, 107.0, 110.0, 108.0, 111.0];
        let result = rsi(&closes, 3);

        assert_eq!(result.len(), closes.len());
        assert_eq!(&result[..3], &[None, None, None]);
        // changes +2, -1, +4: avg gain 2, avg loss 1/3, RS 6
        assert_abs_diff_eq!(result[3].unwrap(), 100.0 - 100.0 / 7.0, epsilon = 1e-9);

        for value in result.iter().flatten() {
            assert!((0.0..=100.0).contains(value));
        }
    }

    #[test]
    fn test_rsi_all_gains() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&prices, 14);
        assert_eq!(result[14], Some(100.0));
        assert_eq!(result[19], Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&prices, 14)[15], Some(0.0));
    }

    #[test]
    fn test_rsi_no_change() {
        let prices = vec![100.0; 20];
        assert_eq!(rsi(&prices, 14)[14], Some(50.0));
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(rsi(&[1.0, 2.0, 3.0], 3).iter().all(Option::is_none));
        assert!(rsi(&[1.0, 2.0, 3.0], 0).iter().all(Option::is_none));
    }
}
