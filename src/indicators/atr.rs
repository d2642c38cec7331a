// =============================================================================
// Average True Range (ATR) — simple mean of true range
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is the plain mean of the first `period` TR values, starting at bar 1
// (bar 0 only supplies the previous close). The caller passes the trailing
// `period + 1` bars.
//
// Default period: 14
// =============================================================================

/// Reported when no meaningful volatility estimate can be made.
pub const ATR_NEUTRAL: f64 = 0.0;

/// True range of one bar given the previous close.
///
/// `f64::max` swallows NaN, so non-finite inputs are propagated explicitly.
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    if !(high.is_finite() && low.is_finite() && prev_close.is_finite()) {
        return f64::NAN;
    }
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// Compute ATR from parallel `highs` / `lows` / `closes` (oldest first).
///
/// # Returns
/// [`ATR_NEUTRAL`] when:
/// - `period` is zero.
/// - The three slices differ in length.
/// - There are fewer than `period + 1` bars.
/// - The mean is non-finite.
pub fn calculate_atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    let n = closes.len();
    if period == 0 || highs.len() != n || lows.len() != n || n < period + 1 {
        return ATR_NEUTRAL;
    }

    let sum: f64 = (1..=period)
        .map(|i| true_range(highs[i], lows[i], closes[i - 1]))
        .sum();
    let atr = sum / period as f64;

    if atr.is_finite() {
        atr
    } else {
        ATR_NEUTRAL
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// Split (high, low, close) bars into parallel vectors.
    fn bars(rows: &[(f64, f64, f64)]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            rows.iter().map(|r| r.0).collect(),
            rows.iter().map(|r| r.1).collect(),
            rows.iter().map(|r| r.2).collect(),
        )
    }

    #[test]
    fn atr_period_zero() {
        let (h, l, c) = bars(&[(105.0, 95.0, 102.0); 20]);
        assert_eq!(calculate_atr(&h, &l, &c, 0), ATR_NEUTRAL);
    }

    #[test]
    fn atr_insufficient_data() {
        // Need period + 1 = 15 bars for period=14, only have 14.
        let (h, l, c) = bars(&[(105.0, 95.0, 102.0); 14]);
        assert_eq!(calculate_atr(&h, &l, &c, 14), ATR_NEUTRAL);
    }

    #[test]
    fn atr_mismatched_lengths() {
        let (h, l, mut c) = bars(&[(105.0, 95.0, 102.0); 20]);
        c.pop();
        assert_eq!(calculate_atr(&h, &l, &c, 14), ATR_NEUTRAL);
    }

    #[test]
    fn atr_constant_range() {
        // H-L = 10 on every bar, close at midpoint: TR is exactly 10.
        let rows: Vec<(f64, f64, f64)> = (0..15).map(|_| (105.0, 95.0, 100.0)).collect();
        let (h, l, c) = bars(&rows);
        assert!((calculate_atr(&h, &l, &c, 14) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn atr_true_range_uses_prev_close() {
        // Gap up: |115 - 95| = 20 > 115 - 108 = 7
        let (h, l, c) = bars(&[
            (105.0, 95.0, 95.0),
            (115.0, 108.0, 112.0),
        ]);
        assert_eq!(calculate_atr(&h, &l, &c, 1), 20.0);
    }

    #[test]
    fn atr_known_mean() {
        let (h, l, c) = bars(&[
            (102.0, 98.0, 101.0),
            (104.0, 99.0, 103.0), // TR = 5
            (106.0, 100.0, 105.0), // TR = 6
            (108.0, 102.0, 107.0), // TR = 6
        ]);
        let atr = calculate_atr(&h, &l, &c, 3);
        assert!((atr - 17.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn atr_nan_returns_neutral() {
        let (h, l, c) = bars(&[
            (105.0, 95.0, 100.0),
            (f64::NAN, 95.0, 100.0),
            (105.0, 95.0, 100.0),
        ]);
        assert_eq!(calculate_atr(&h, &l, &c, 2), ATR_NEUTRAL);
    }
}
