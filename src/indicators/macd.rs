// =============================================================================
// Moving Average Convergence Divergence (MACD) line
// =============================================================================
//
//   MACD = EMA(w, 12) - EMA(w, 26)
//
// where `w` is the trailing 26 closes. Both EMAs are seeded on the same first
// close of `w`, so fast and slow share one lookback. Only the MACD line is
// produced; the dashboard has no use for the signal line or histogram.
// =============================================================================

use super::ema::calculate_ema;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;

/// Reported when fewer than [`MACD_SLOW`] closes are available.
pub const MACD_NEUTRAL: f64 = 0.0;

/// Compute the MACD line over the trailing [`MACD_SLOW`] closes.
pub fn calculate_macd(closes: &[f64]) -> f64 {
    if closes.len() < MACD_SLOW {
        return MACD_NEUTRAL;
    }

    let window = &closes[closes.len() - MACD_SLOW..];
    match (
        calculate_ema(window, MACD_FAST),
        calculate_ema(window, MACD_SLOW),
    ) {
        (Some(fast), Some(slow)) => fast - slow,
        _ => MACD_NEUTRAL,
    }
}
