//! Volume-based indicators: On-Balance Volume and Volume-Price Trend.

/// Calculate On-Balance Volume.
///
/// Starts at 0. Each day's volume is added when the close rises, subtracted
/// when it falls, and ignored when it is unchanged.
///
/// Pairs closes with volumes position by position; extra values in the
/// longer slice are ignored.
pub fn obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let n = closes.len().min(volumes.len());
    let mut result = Vec::with_capacity(n);
    if n == 0 {
        return result;
    }

    let mut total = 0.0;
    result.push(total);
    for i in 1..n {
        if closes[i] > closes[i - 1] {
            total += volumes[i];
        } else if closes[i] < closes[i - 1] {
            total -= volumes[i];
        }
        result.push(total);
    }

    result
}

/// Calculate Volume-Price Trend.
///
/// `VPT[i] = VPT[i-1] + volume[i] * (close[i] - close[i-1]) / close[i-1]`,
/// starting at 0. A zero previous close adds nothing.
pub fn vpt(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let n = closes.len().min(volumes.len());
    let mut result = Vec::with_capacity(n);
    if n == 0 {
        return result;
    }

    let mut total = 0.0;
    result.push(total);
    for i in 1..n {
        let prev = closes[i - 1];
        if prev != 0.0 {
            total += volumes[i] * (closes[i] - prev) / prev;
        }
        result.push(total);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_obv() {
        let closes = [10.0, 11.0, 11.0, 10.0, 12.0];
        let volumes = [100.0, 200.0, 300.0, 400.0, 500.0];

        assert_eq!(obv(&closes, &volumes), vec![0.0, 200.0, 200.0, -200.0, 300.0]);
    }

    #[test]
    fn test_obv_uneven_lengths() {
        assert_eq!(obv(&[1.0, 2.0, 3.0], &[10.0, 20.0]), vec![0.0, 20.0]);
        assert!(obv(&[], &[1.0]).is_empty());
    }

    #[test]
    fn test_vpt() {
        let closes = [10.0, 11.0, 11.0, 9.9];
        let volumes = [100.0, 200.0, 300.0, 400.0];
        let expected = [0.0, 20.0, 20.0, -20.0];

        let result = vpt(&closes, &volumes);
        assert_eq!(result.len(), 4);
        for (value, want) in result.iter().zip(expected) {
            assert_abs_diff_eq!(*value, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_vpt_zero_close() {
        let result = vpt(&[0.0, 5.0, 6.0], &[1.0, 1.0, 10.0]);
        assert_eq!(result[1], 0.0);
        assert_abs_diff_eq!(result[2], 2.0, epsilon = 1e-12);
    }
}
