// =============================================================================
// Snapshot Merger — fallback substitution and final validation
// =============================================================================
//
// Current-value indicators and open interest go through the configured
// `SubstitutionPolicy`. Intraday values that are not finite are replaced by
// their indicator's neutral value. The 4h fields have no live computation and
// always come from the fallback table.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use super::assembler::Assembled;
use super::{IntradaySeries, MarketSnapshot};
use crate::config::{FallbackTable, SubstitutionPolicy};
use crate::indicators::{MACD_NEUTRAL, RSI_NEUTRAL};
use crate::types::{DerivativesStats, HistorySource, LivePrice};

/// Below this magnitude a value counts as zero under the legacy policy.
const ZERO_EPSILON: f64 = 1e-12;

pub struct SnapshotMerger<'a> {
    policy: SubstitutionPolicy,
    fallbacks: &'a FallbackTable,
}

impl<'a> SnapshotMerger<'a> {
    pub fn new(policy: SubstitutionPolicy, fallbacks: &'a FallbackTable) -> Self {
        Self { policy, fallbacks }
    }

    /// Apply the policy to one value.
    pub fn substitute(&self, field: &'static str, value: f64, default: f64) -> f64 {
        let replace = match self.policy {
            SubstitutionPolicy::Legacy => !value.is_finite() || value.abs() < ZERO_EPSILON,
            SubstitutionPolicy::NonFiniteOnly => !value.is_finite(),
        };
        if replace {
            debug!(field, value, default, policy = ?self.policy, "substituting default");
            default
        } else {
            value
        }
    }

    pub fn merge(
        &self,
        price: LivePrice,
        data_source: HistorySource,
        assembled: Assembled,
        derivatives: DerivativesStats,
        now: DateTime<Utc>,
    ) -> Result<MarketSnapshot> {
        let fb = self.fallbacks;
        let ind = assembled.indicators;
        let intraday = sanitize_intraday(assembled.intraday, price.value);
        let (current_volume, average_volume) = match assembled.volume {
            Some(v) => (
                self.substitute("current_volume", v.current, fb.current_volume),
                self.substitute("average_volume", v.average, fb.average_volume),
            ),
            None => (fb.current_volume, fb.average_volume),
        };

        let snapshot = MarketSnapshot {
            current_price: price.value,
            current_ema20: self.substitute("current_ema20", ind.ema20, fb.current_ema20),
            current_macd: self.substitute("current_macd", ind.macd, fb.current_macd),
            current_rsi_7: self.substitute("current_rsi_7", ind.rsi7, fb.current_rsi_7),
            current_rsi_14: self.substitute("current_rsi_14", ind.rsi14, fb.current_rsi_14),
            current_ema50: self.substitute("current_ema50", ind.ema50, fb.current_ema50),
            current_atr_14: self.substitute("current_atr_14", ind.atr14, fb.current_atr_14),

            open_interest: self.substitute(
                "open_interest",
                derivatives.open_interest,
                fb.open_interest,
            ),
            open_interest_avg: self.substitute(
                "open_interest_avg",
                derivatives.open_interest_avg,
                fb.open_interest_avg,
            ),
            funding_rate: derivatives.funding_rate,

            intraday_prices: intraday.prices,
            intraday_ema20: intraday.ema20,
            intraday_macd: intraday.macd,
            intraday_rsi_7: intraday.rsi7,
            intraday_rsi_14: intraday.rsi14,

            ema_20_4h: fb.ema_20_4h,
            ema_50_4h: fb.ema_50_4h,
            atr_3_4h: fb.atr_3_4h,
            atr_14_4h: fb.atr_14_4h,

            current_volume,
            average_volume,

            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            data_source,
            price_source: price.source,
        };

        snapshot.ensure_finite().context("snapshot failed the finiteness check")?;
        Ok(snapshot)
    }
}

fn replace_non_finite(values: &mut [f64], neutral: f64) {
    for v in values.iter_mut().filter(|v| !v.is_finite()) {
        *v = neutral;
    }
}

/// Replace non-finite intraday values by the neutral value of their indicator.
pub fn sanitize_intraday(mut series: IntradaySeries, live_price: f64) -> IntradaySeries {
    replace_non_finite(&mut series.prices, live_price);
    replace_non_finite(&mut series.ema20, live_price);
    replace_non_finite(&mut series.macd, MACD_NEUTRAL);
    replace_non_finite(&mut series.rsi7, RSI_NEUTRAL);
    replace_non_finite(&mut series.rsi14, RSI_NEUTRAL);
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{IndicatorSnapshot, VolumeStats};
    use crate::types::PriceSource;
    use chrono::TimeZone;

    fn assembled(macd: f64) -> Assembled {
        Assembled {
            indicators: IndicatorSnapshot {
                ema20: 100.0,
                ema50: 99.0,
                macd,
                rsi7: 60.0,
                rsi14: 55.0,
                atr14: 2.0,
            },
            intraday: IntradaySeries {
                prices: vec![100.0; 10],
                ema20: vec![100.0; 10],
                macd: vec![0.0; 10],
                rsi7: vec![50.0; 10],
                rsi14: vec![50.0; 10],
            },
            volume: None,
        }
    }

    fn derivs() -> DerivativesStats {
        DerivativesStats {
            open_interest: 30_000.0,
            open_interest_avg: 29_000.0,
            funding_rate: "0.0001".into(),
        }
    }

    fn price() -> LivePrice {
        LivePrice {
            value: 100.5,
            source: PriceSource::Pyth,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn legacy_replaces_zero_and_non_finite() {
        let fb = FallbackTable::default();
        let m = SnapshotMerger::new(SubstitutionPolicy::Legacy, &fb);
        assert_eq!(m.substitute("x", 0.0, 7.0), 7.0);
        assert_eq!(m.substitute("x", 1e-13, 7.0), 7.0);
        assert_eq!(m.substitute("x", f64::NAN, 7.0), 7.0);
        assert_eq!(m.substitute("x", -3.0, 7.0), -3.0);
    }

    #[test]
    fn non_finite_only_keeps_genuine_zero() {
        let fb = FallbackTable::default();
        let m = SnapshotMerger::new(SubstitutionPolicy::NonFiniteOnly, &fb);
        assert_eq!(m.substitute("x", 0.0, 7.0), 0.0);
        assert_eq!(m.substitute("x", f64::INFINITY, 7.0), 7.0);
    }

    #[test]
    fn zero_macd_under_each_policy() {
        let fb = FallbackTable::default();

        let legacy = SnapshotMerger::new(SubstitutionPolicy::Legacy, &fb)
            .merge(price(), HistorySource::Binance, assembled(0.0), derivs(), now())
            .unwrap();
        assert_eq!(legacy.current_macd, fb.current_macd);

        let strict = SnapshotMerger::new(SubstitutionPolicy::NonFiniteOnly, &fb)
            .merge(price(), HistorySource::Binance, assembled(0.0), derivs(), now())
            .unwrap();
        assert_eq!(strict.current_macd, 0.0);
    }

    #[test]
    fn merge_fills_static_and_volume_defaults() {
        let fb = FallbackTable::default();
        let s = SnapshotMerger::new(SubstitutionPolicy::Legacy, &fb)
            .merge(price(), HistorySource::Coingecko, assembled(1.5), derivs(), now())
            .unwrap();
        assert_eq!(s.current_price, 100.5);
        assert_eq!(s.current_macd, 1.5);
        assert_eq!(s.ema_20_4h, fb.ema_20_4h);
        assert_eq!(s.atr_14_4h, fb.atr_14_4h);
        assert_eq!(s.current_volume, fb.current_volume);
        assert_eq!(s.average_volume, fb.average_volume);
        assert_eq!(s.timestamp, "2025-07-01T12:00:00.000Z");
        assert_eq!(s.funding_rate, "0.0001");
    }

    #[test]
    fn merge_uses_live_volumes() {
        let fb = FallbackTable::default();
        let mut a = assembled(1.0);
        a.volume = Some(VolumeStats {
            current: 12.0,
            average: 30.0,
        });
        let s = SnapshotMerger::new(SubstitutionPolicy::Legacy, &fb)
            .merge(price(), HistorySource::Binance, a, derivs(), now())
            .unwrap();
        assert_eq!(s.current_volume, 12.0);
        assert_eq!(s.average_volume, 30.0);
    }

    #[test]
    fn intraday_nan_becomes_neutral() {
        let fb = FallbackTable::default();
        let mut a = assembled(1.0);
        a.intraday.ema20[3] = f64::NAN;
        a.intraday.macd[4] = f64::INFINITY;
        a.intraday.rsi14[5] = f64::NAN;
        let s = SnapshotMerger::new(SubstitutionPolicy::NonFiniteOnly, &fb)
            .merge(price(), HistorySource::Binance, a, derivs(), now())
            .unwrap();
        assert_eq!(s.intraday_ema20[3], 100.5);
        assert_eq!(s.intraday_macd[4], 0.0);
        assert_eq!(s.intraday_rsi_14[5], 50.0);
    }

    #[test]
    fn non_finite_price_is_an_internal_error() {
        let fb = FallbackTable::default();
        let bad = LivePrice {
            value: f64::NAN,
            source: PriceSource::Pyth,
        };
        let err = SnapshotMerger::new(SubstitutionPolicy::Legacy, &fb)
            .merge(bad, HistorySource::Binance, assembled(1.0), derivs(), now())
            .unwrap_err();
        assert!(format!("{err:#}").contains("current_price"));
    }
}
