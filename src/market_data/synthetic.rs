// =============================================================================
// Synthetic History — substitute series when every history source fails
// =============================================================================
//
//   base_i  = start + (price - start) * i / (len - 1),   start = ratio * price
//   close_i = base_i + U(-1, 1) * noise_pct * price
//   close_{len-1} = price   (exactly)
//
// The RNG is seeded from the configured seed and the price bits, so the same
// price always yields the same series.
// =============================================================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::OhlcSeries;
use crate::config::SyntheticSettings;

/// Lowest value a synthetic close may take, as a fraction of the price.
const FLOOR_RATIO: f64 = 0.01;

/// Build `len` closes trending up to `price`, with estimated extremes.
///
/// `len == 0` is treated as 1 so the result is never empty.
pub fn synthesize(
    price: f64,
    len: usize,
    settings: &SyntheticSettings,
    range_pct: f64,
) -> OhlcSeries {
    let len = len.max(1);
    let start = price * settings.start_ratio;
    let amplitude = price * settings.noise_pct;
    let floor = price * FLOOR_RATIO;
    let mut rng = StdRng::seed_from_u64(settings.seed ^ price.to_bits());

    let mut closes: Vec<f64> = (0..len)
        .map(|i| {
            let t = if len > 1 { i as f64 / (len - 1) as f64 } else { 1.0 };
            let base = start + (price - start) * t;
            let noise = if amplitude > 0.0 {
                rng.gen_range(-1.0_f64..=1.0) * amplitude
            } else {
                0.0
            };
            (base + noise).max(floor)
        })
        .collect();

    // Join point with the live price.
    closes[len - 1] = price;

    OhlcSeries::with_estimated_extremes(closes, range_pct)
}
