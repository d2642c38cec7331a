// =============================================================================
// Indicator Assembler
// =============================================================================
//
// Current values use fixed trailing windows of the history closes:
//
//   EMA20 <- last 20    EMA50 <- last 50    MACD  <- last 26
//   RSI7  <- last 8     RSI14 <- last 15    ATR14 <- last 15 bars
//
// The intraday window is the last 10 closes with the final one replaced by
// the live price. Position `i` of every intraday series is computed over the
// prefix `window[0..=i]` (growing window) with clamped periods:
//
//   EMA20: period = min(20, i + 1)   -> ema20[0] == window[0]
//   RSI  : period = min(n, i)        -> the prefix holds exactly i deltas;
//                                       i == 0 has none and reports 50
//   MACD : full rule, so 0 until the prefix reaches 26 points
// =============================================================================

use tracing::debug;

use super::{IndicatorSnapshot, IntradaySeries, VolumeStats};
use crate::indicators::{calculate_atr, calculate_macd, calculate_rsi, ema_or, rsi_zone};
use crate::market_data::{History, OhlcSeries, INTRADAY_LEN};

const EMA_FAST: usize = 20;
const EMA_SLOW: usize = 50;
const RSI_SHORT: usize = 7;
const RSI_LONG: usize = 14;
const ATR_PERIOD: usize = 14;
const MACD_WINDOW: usize = 26;

/// Everything the indicator engine derives from one history + price.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub indicators: IndicatorSnapshot,
    pub intraday: IntradaySeries,
    /// `None` when the series carries no base-asset volume.
    pub volume: Option<VolumeStats>,
}

/// Current-value indicators. `live_price` is the neutral EMA for an empty
/// series.
pub fn current_indicators(series: &OhlcSeries, live_price: f64) -> IndicatorSnapshot {
    let (highs, lows, closes) = series.tail(ATR_PERIOD + 1);

    IndicatorSnapshot {
        ema20: ema_or(series.tail_closes(EMA_FAST), EMA_FAST, live_price),
        ema50: ema_or(series.tail_closes(EMA_SLOW), EMA_SLOW, live_price),
        macd: calculate_macd(series.tail_closes(MACD_WINDOW)),
        rsi7: calculate_rsi(series.tail_closes(RSI_SHORT + 1), RSI_SHORT),
        rsi14: calculate_rsi(series.tail_closes(RSI_LONG + 1), RSI_LONG),
        atr14: calculate_atr(highs, lows, closes, ATR_PERIOD),
    }
}

/// The last [`INTRADAY_LEN`] closes with the newest overwritten by the live
/// price. Shorter histories give a shorter window; an empty one gives just
/// the live price.
pub fn intraday_window(closes: &[f64], live_price: f64) -> Vec<f64> {
    let mut window = closes[closes.len().saturating_sub(INTRADAY_LEN)..].to_vec();
    match window.last_mut() {
        Some(last) => *last = live_price,
        None => window.push(live_price),
    }
    window
}

/// Growing-window indicator series over `window`.
pub fn growing_window(window: &[f64]) -> IntradaySeries {
    let n = window.len();
    let mut out = IntradaySeries {
        prices: window.to_vec(),
        ema20: Vec::with_capacity(n),
        macd: Vec::with_capacity(n),
        rsi7: Vec::with_capacity(n),
        rsi14: Vec::with_capacity(n),
    };

    for i in 0..n {
        let prefix = &window[..=i];
        out.ema20.push(ema_or(prefix, EMA_FAST.min(i + 1), window[i]));
        out.macd.push(calculate_macd(prefix));
        out.rsi7.push(calculate_rsi(prefix, RSI_SHORT.min(i)));
        out.rsi14.push(calculate_rsi(prefix, RSI_LONG.min(i)));
    }

    out
}

/// Last-bar and mean volume, when the series has volumes.
pub fn volume_stats(series: &OhlcSeries) -> Option<VolumeStats> {
    let volumes = series.volumes.as_ref().filter(|v| !v.is_empty())?;
    let current = *volumes.last()?;
    let average = volumes.iter().sum::<f64>() / volumes.len() as f64;
    Some(VolumeStats { current, average })
}

/// Run the whole indicator engine for one invocation.
pub fn assemble(history: &History, live_price: f64) -> Assembled {
    let indicators = current_indicators(&history.series, live_price);
    let window = intraday_window(&history.series.closes, live_price);
    let intraday = growing_window(&window);
    let volume = volume_stats(&history.series);

    debug!(
        source = %history.source,
        ema20 = indicators.ema20,
        macd = indicators.macd,
        rsi14 = indicators.rsi14,
        zone = rsi_zone(indicators.rsi14),
        atr14 = indicators.atr14,
        "indicators assembled"
    );

    Assembled {
        indicators,
        intraday,
        volume,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HistorySource;

    fn linear_series(start: f64, step: f64, n: usize) -> OhlcSeries {
        let closes: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
        OhlcSeries::with_estimated_extremes(closes, 0.0)
    }

    #[test]
    fn ema20_on_linear_series_matches_closed_form() {
        // closes 100, 102, ..., 200 (51 points). EMA seeded on the 20th-last
        // close of a line with step d:
        //   EMA = last - d * (1-k)/k * (1 - (1-k)^19),  k = 2/21
        let s = linear_series(100.0, 2.0, 51);
        let ind = current_indicators(&s, 200.0);

        let k: f64 = 2.0 / 21.0;
        let expected = 200.0 - 2.0 * ((1.0 - k) / k) * (1.0 - (1.0 - k).powi(19));
        assert!((ind.ema20 - expected).abs() < 1e-9, "got {}, expected {expected}", ind.ema20);
        assert!((ind.rsi14 - 100.0).abs() < 1e-12);
        assert!((ind.rsi7 - 100.0).abs() < 1e-12);
        assert!(ind.macd > 0.0);
    }

    #[test]
    fn short_history_degrades_to_neutral_values() {
        let s = linear_series(100.0, 1.0, 10);
        let ind = current_indicators(&s, 150.0);
        assert_eq!(ind.macd, 0.0);
        assert_eq!(ind.atr14, 0.0);
        // EMA50 with only 10 closes is the last close.
        assert_eq!(ind.ema50, 109.0);
        assert!((ind.rsi7 - 100.0).abs() < 1e-12);
        assert_eq!(ind.rsi14, 50.0);
    }

    #[test]
    fn atr_uses_trailing_fifteen_bars() {
        let s = linear_series(100.0, 1.0, 40);
        // Estimated range 0 => highs == lows == closes, TR = |close - prev| = 1.
        let ind = current_indicators(&s, 139.0);
        assert!((ind.atr14 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn window_overwrites_last_close_with_live_price() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let w = intraday_window(&closes, 99.5);
        assert_eq!(w.len(), 10);
        assert_eq!(w[0], 20.0);
        assert_eq!(w[8], 28.0);
        assert_eq!(w[9], 99.5);
    }

    #[test]
    fn window_on_empty_history_is_the_price() {
        assert_eq!(intraday_window(&[], 42.0), vec![42.0]);
    }

    #[test]
    fn growing_window_first_point() {
        let window = vec![
            108_485.0, 108_339.0, 108_250.0, 108_181.5, 108_310.5, 108_288.5, 108_446.0, 108_403.0,
            108_396.5, 108_318.5,
        ];
        let g = growing_window(&window);
        assert_eq!(g.ema20[0], window[0]);
        assert_eq!(g.rsi7[0], 50.0);
        assert_eq!(g.rsi14[0], 50.0);
        assert!(g.macd.iter().all(|m| *m == 0.0));
        assert_eq!(g.prices, window);
        for v in [&g.ema20, &g.macd, &g.rsi7, &g.rsi14] {
            assert_eq!(v.len(), 10);
            assert!(v.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn growing_window_periods_are_clamped() {
        let window: Vec<f64> = vec![10.0, 11.0, 10.5, 12.0, 11.0, 13.0, 12.5, 14.0, 13.0, 15.0];
        let g = growing_window(&window);
        for i in 1..window.len() {
            let prefix = &window[..=i];
            assert_eq!(g.ema20[i], ema_or(prefix, i + 1, 0.0));
            assert_eq!(g.rsi7[i], calculate_rsi(prefix, 7.min(i)));
            assert_eq!(g.rsi14[i], calculate_rsi(prefix, i));
        }
        // Position 1: one delta of +1 => RSI 100.
        assert_eq!(g.rsi14[1], 100.0);
        // Position 2: deltas +1, -0.5 => RS = 2 => 66.67.
        assert!((g.rsi14[2] - (100.0 - 100.0 / 3.0)).abs() < 1e-10);
    }

    #[test]
    fn volume_stats_need_volumes() {
        let mut s = linear_series(100.0, 1.0, 4);
        assert!(volume_stats(&s).is_none());
        s.volumes = Some(vec![1.0, 2.0, 3.0, 6.0]);
        assert_eq!(volume_stats(&s), Some(VolumeStats { current: 6.0, average: 3.0 }));
    }

    #[test]
    fn assemble_is_deterministic() {
        let history = History {
            series: linear_series(100.0, 0.5, 60),
            source: HistorySource::Coingecko,
        };
        assert_eq!(assemble(&history, 130.0), assemble(&history, 130.0));
    }
}
