// =============================================================================
// Relative Strength Index (RSI) — simple-average form
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Take the first `period` deltas of the slice (i = 1..=period).
// Step 2 — avg_gain = sum(gains) / period,  avg_loss = sum(losses) / period.
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// No Wilder smoothing: the caller passes the trailing `period + 1` closes, so
// the first `period` deltas are the most recent ones.
// =============================================================================

/// Neutral RSI reported when there is not enough data to form an opinion.
pub const RSI_NEUTRAL: f64 = 50.0;

/// Compute RSI over the first `period` deltas of `closes`.
///
/// # Edge cases
/// - `period == 0` => [`RSI_NEUTRAL`]
/// - `closes.len() <= period` => [`RSI_NEUTRAL`]
/// - No losses in the window => 100.0 (this includes a perfectly flat window)
pub fn calculate_rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() <= period {
        return RSI_NEUTRAL;
    }

    let (gains, losses) = closes[..=period]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0_f64, 0.0_f64), |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });

    let period_f = period as f64;
    let avg_gain = gains / period_f;
    let avg_loss = losses / period_f;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Human-readable zone label for an RSI value.
pub fn rsi_zone(value: f64) -> &'static str {
    if value >= 70.0 {
        "OVERBOUGHT"
    } else if value <= 30.0 {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    }
}
