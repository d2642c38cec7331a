// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   k     = 2 / (period + 1)
//   EMA_t = close_t * k + EMA_{t-1} * (1 - k)
//
// The very first EMA value is seeded with the first close of the slice, so
// the caller controls the lookback by choosing which trailing slice to pass.
// =============================================================================

/// Compute the latest EMA value over `closes` with look-back `period`.
///
/// Returns `None` only for an empty slice.
///
/// # Edge cases
/// - `closes.len() < period` => the last close (not enough data to weight).
/// - `period == 0` => the last close (degenerate multiplier).
pub fn calculate_ema(closes: &[f64], period: usize) -> Option<f64> {
    let last = *closes.last()?;
    if period == 0 || closes.len() < period {
        return Some(last);
    }

    let k = 2.0 / (period + 1) as f64;
    let mut ema = closes[0];
    for &close in &closes[1..] {
        ema = close * k + ema * (1.0 - k);
    }

    Some(ema)
}

/// Like [`calculate_ema`], returning `neutral` for an empty slice.
pub fn ema_or(closes: &[f64], period: usize, neutral: f64) -> f64 {
    calculate_ema(closes, period).unwrap_or(neutral)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: build a simple ascending price series.
    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_none());
        assert_eq!(ema_or(&[], 5, 42.0), 42.0);
    }

    #[test]
    fn ema_period_zero_returns_last() {
        assert_eq!(calculate_ema(&[1.0, 2.0, 3.0], 0), Some(3.0));
    }

    #[test]
    fn ema_insufficient_data_returns_last() {
        assert_eq!(calculate_ema(&[1.0, 2.0], 5), Some(2.0));
    }

    #[test]
    fn ema_constant_series() {
        let closes = vec![100.0; 20];
        for period in [1, 5, 12, 20] {
            let ema = calculate_ema(&closes, period).unwrap();
            assert!((ema - 100.0).abs() < 1e-10, "period {period}: got {ema}");
        }
    }

    #[test]
    fn ema_single_point_period_one() {
        assert_eq!(calculate_ema(&[123.5], 1), Some(123.5));
    }

    #[test]
    fn ema_known_values() {
        // 3-period EMA of [2, 4, 6] seeded on 2, k = 0.5:
        //   4*0.5 + 2*0.5 = 3;  6*0.5 + 3*0.5 = 4.5
        let ema = calculate_ema(&[2.0, 4.0, 6.0], 3).unwrap();
        assert!((ema - 4.5).abs() < 1e-12);
    }

    #[test]
    fn ema_matches_recurrence() {
        let closes = ascending(30);
        let k = 2.0 / 11.0;
        let mut expected = closes[0];
        for &c in &closes[1..] {
            expected = c * k + expected * (1.0 - k);
        }
        let ema = calculate_ema(&closes, 10).unwrap();
        assert!((ema - expected).abs() < 1e-10, "got {ema}, expected {expected}");
    }

    #[test]
    fn ema_lags_rising_series() {
        let closes = ascending(50);
        let ema = calculate_ema(&closes, 20).unwrap();
        assert!(ema < 50.0);
        assert!(ema > 1.0);
    }

    #[test]
    fn ema_is_idempotent() {
        let closes = vec![10.0, 11.5, 9.8, 12.2, 13.0, 12.7];
        assert_eq!(calculate_ema(&closes, 4), calculate_ema(&closes, 4));
    }
}
