// =============================================================================
// Snapshot Service — one invocation, end to end
// =============================================================================
//
//   price chain ─┐
//   history (real attempts) ─┼─ join ─> resolve history ─> assemble ─> merge
//   derivatives chains ─┘
//
// The only data dependency, the synthetic history anchor, is resolved after
// the join. Nothing is cached between invocations.
// =============================================================================

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use super::assembler::assemble;
use super::merger::SnapshotMerger;
use super::MarketSnapshot;
use crate::config::{FallbackTable, ServiceConfig, SubstitutionPolicy};
use crate::market_data::{DerivativesAcquirer, HistoryAcquirer, PriceAcquirer};

pub struct SnapshotService {
    price: PriceAcquirer,
    history: HistoryAcquirer,
    derivatives: DerivativesAcquirer,
    policy: SubstitutionPolicy,
    fallbacks: FallbackTable,
}

impl SnapshotService {
    pub fn new(
        price: PriceAcquirer,
        history: HistoryAcquirer,
        derivatives: DerivativesAcquirer,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            price,
            history,
            derivatives,
            policy: config.substitution,
            fallbacks: config.fallbacks.clone(),
        }
    }

    /// Wire the production source chains onto a shared HTTP client.
    pub fn from_config(client: &reqwest::Client, config: &ServiceConfig) -> Self {
        Self::new(
            PriceAcquirer::from_config(client, config),
            HistoryAcquirer::from_config(client, config),
            DerivativesAcquirer::from_config(client, config),
            config,
        )
    }

    /// Build one snapshot. Source failures degrade to fallbacks; only an
    /// internal inconsistency is returned as an error.
    pub async fn snapshot(&self) -> Result<MarketSnapshot> {
        let (price, real_history, derivatives) = tokio::join!(
            self.price.acquire(),
            self.history.fetch_real(),
            self.derivatives.acquire(),
        );

        let history = self.history.resolve(real_history, price.value);
        if history.source.is_synthetic() {
            warn!(price = price.value, "snapshot built on synthetic history");
        }

        let assembled = assemble(&history, price.value);
        let snapshot = SnapshotMerger::new(self.policy, &self.fallbacks).merge(
            price,
            history.source,
            assembled,
            derivatives,
            Utc::now(),
        )?;

        info!(
            price = snapshot.current_price,
            price_source = %snapshot.price_source,
            data_source = %snapshot.data_source,
            rsi_14 = snapshot.current_rsi_14,
            "snapshot ready"
        );
        Ok(snapshot)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyntheticSettings;
    use crate::market_data::OhlcSeries;
    use crate::sources::chain::tests::Scripted;
    use crate::sources::SourceChain;
    use crate::types::{HistorySource, PerpTicker, PriceSource};
    use std::time::Duration;

    const T: Duration = Duration::from_millis(200);

    fn service(
        price: SourceChain<f64>,
        history: SourceChain<OhlcSeries>,
        ticker: SourceChain<PerpTicker>,
        average: SourceChain<f64>,
        config: &ServiceConfig,
    ) -> SnapshotService {
        SnapshotService::new(
            PriceAcquirer::new(price, config.fallbacks.current_price),
            HistoryAcquirer::new(
                history,
                config.sources.history_limit,
                config.sources.min_history_points,
                SyntheticSettings::default(),
                config.estimated_range_pct,
            ),
            DerivativesAcquirer::new(ticker, average, &config.fallbacks),
            config,
        )
    }

    #[tokio::test]
    async fn every_source_down_still_serves_a_full_snapshot() {
        let config = ServiceConfig::default();
        let svc = service(
            SourceChain::new("price", T)
                .with_source(Scripted::<f64>::failing("pyth"))
                .with_source(Scripted::<f64>::failing("coingecko")),
            SourceChain::new("history", T)
                .with_source(Scripted::<OhlcSeries>::failing("binance"))
                .with_source(Scripted::<OhlcSeries>::failing("coingecko_chart")),
            SourceChain::new("derivatives", T)
                .with_source(Scripted::<PerpTicker>::failing("bybit")),
            SourceChain::new("open_interest_avg", T)
                .with_source(Scripted::<f64>::failing("bybit_oi_history")),
            &config,
        );

        let s = svc.snapshot().await.unwrap();
        assert_eq!(s.data_source, HistorySource::Synthetic);
        assert_eq!(s.price_source, PriceSource::Fallback);
        assert_eq!(s.current_price, 108_318.5);
        assert_eq!(s.intraday_prices.len(), 10);
        assert_eq!(s.intraday_prices[9], 108_318.5);
        assert_eq!(s.open_interest, 26_808.17);
        assert_eq!(s.funding_rate, "0.0000125");
        assert!(s.ensure_finite().is_ok());

        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["data_source"], "synthetic");
        assert_eq!(json["price_source"], "fallback");
    }

    #[tokio::test]
    async fn linear_history_with_live_price() {
        let config = ServiceConfig::default();
        let closes: Vec<f64> = (0..51).map(|i| 100.0 + 2.0 * i as f64).collect();
        let series =
            OhlcSeries::observed(closes.clone(), closes.clone(), closes, Some(vec![5.0; 51]));

        let svc = service(
            SourceChain::new("price", T).with_source(Scripted::ok("pyth", 200.0)),
            SourceChain::new("history", T).with_source(Scripted::ok("binance", series)),
            SourceChain::new("derivatives", T).with_source(Scripted::ok(
                "bybit",
                PerpTicker {
                    open_interest: 50_000.0,
                    funding_rate: "0.0001".into(),
                },
            )),
            SourceChain::new("open_interest_avg", T)
                .with_source(Scripted::ok("bybit_oi_history", 48_000.0)),
            &config,
        );

        let s = svc.snapshot().await.unwrap();
        let k: f64 = 2.0 / 21.0;
        let expected_ema = 200.0 - 2.0 * ((1.0 - k) / k) * (1.0 - (1.0 - k).powi(19));

        assert_eq!(s.data_source, HistorySource::Binance);
        assert_eq!(s.price_source, PriceSource::Pyth);
        assert!((s.current_ema20 - expected_ema).abs() < 1e-9);
        assert_eq!(s.current_rsi_14, 100.0);
        assert_eq!(s.intraday_prices[0], 182.0);
        assert_eq!(s.intraday_prices[9], 200.0);
        assert_eq!(s.intraday_ema20[0], 182.0);
        assert_eq!(s.current_volume, 5.0);
        assert_eq!(s.average_volume, 5.0);
        assert_eq!(s.open_interest, 50_000.0);
        assert_eq!(s.open_interest_avg, 48_000.0);
    }

    #[tokio::test]
    async fn chains_run_concurrently() {
        let config = ServiceConfig::default();
        let slow = Duration::from_millis(120);
        let svc = service(
            SourceChain::new("price", T).with_source(Scripted::ok("pyth", 100.0).slow(slow)),
            SourceChain::new("history", T)
                .with_source(Scripted::<OhlcSeries>::failing("binance").slow(slow)),
            SourceChain::new("derivatives", T)
                .with_source(Scripted::<PerpTicker>::failing("bybit").slow(slow)),
            SourceChain::new("open_interest_avg", T)
                .with_source(Scripted::ok("bybit_oi_history", 1.0).slow(slow)),
            &config,
        );

        let started = tokio::time::Instant::now();
        svc.snapshot().await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(300));
    }
}
