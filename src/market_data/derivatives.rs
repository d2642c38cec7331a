// =============================================================================
// Derivatives Acquirer — open interest, its recent average, funding rate
// =============================================================================
//
// Ticker chain:  Bybit linear ticker -> Binance futures (premium index + OI)
// Average chain: Bybit OI history    -> Binance OI history
//
// The two chains are independent and run concurrently. Each falls back to the
// configured constants on its own.
// =============================================================================

use tracing::{info, warn};

use crate::config::{FallbackTable, ServiceConfig};
use crate::error::SourceError;
use crate::sources::binance::{BinanceFuturesSource, BinanceOpenInterestHistorySource};
use crate::sources::bybit::{BybitOpenInterestHistorySource, BybitTickerSource};
use crate::sources::{SourceChain, SourceResult};
use crate::types::{DerivativesStats, PerpTicker};

pub struct DerivativesAcquirer {
    ticker: SourceChain<PerpTicker>,
    average: SourceChain<f64>,
    defaults: DerivativesStats,
}

fn positive(source_name: &'static str, what: &str, value: f64) -> Result<(), SourceError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SourceError::Rejected {
            source_name: source_name.to_string(),
            reason: format!("{what} {value} is not positive"),
        })
    }
}

impl DerivativesAcquirer {
    pub fn new(
        ticker: SourceChain<PerpTicker>,
        average: SourceChain<f64>,
        fallbacks: &FallbackTable,
    ) -> Self {
        Self {
            ticker: ticker.with_validator(|name, t: &PerpTicker| {
                positive(name, "open interest", t.open_interest)
            }),
            average: average.with_validator(|name, avg: &f64| {
                positive(name, "average open interest", *avg)
            }),
            defaults: DerivativesStats {
                open_interest: fallbacks.open_interest,
                open_interest_avg: fallbacks.open_interest_avg,
                funding_rate: fallbacks.funding_rate.clone(),
            },
        }
    }

    /// Production chains: Bybit first, Binance futures second.
    pub fn from_config(client: &reqwest::Client, config: &ServiceConfig) -> Self {
        let s = &config.sources;
        let ticker = SourceChain::new("derivatives", s.source_timeout())
            .with_source(BybitTickerSource::new(client.clone(), &s.bybit_base_url, &s.symbol))
            .with_source(BinanceFuturesSource::new(
                client.clone(),
                &s.binance_futures_base_url,
                &s.symbol,
            ));
        let average = SourceChain::new("open_interest_avg", s.source_timeout())
            .with_source(BybitOpenInterestHistorySource::new(
                client.clone(),
                &s.bybit_base_url,
                &s.symbol,
                s.open_interest_history_limit,
            ))
            .with_source(BinanceOpenInterestHistorySource::new(
                client.clone(),
                &s.binance_futures_base_url,
                &s.symbol,
                s.open_interest_history_limit,
            ));
        Self::new(ticker, average, &config.fallbacks)
    }

    pub async fn acquire(&self) -> DerivativesStats {
        let (ticker, average) = tokio::join!(self.ticker.run(), self.average.run());

        let (open_interest, funding_rate) = match ticker {
            SourceResult::Ok { value, source } => {
                info!(
                    source,
                    open_interest = value.open_interest,
                    funding_rate = %value.funding_rate,
                    "derivatives stats acquired"
                );
                (value.open_interest, value.funding_rate)
            }
            SourceResult::Failed { reasons } => {
                warn!(
                    chain = self.ticker.label(),
                    ?reasons,
                    "every derivatives source failed, using defaults"
                );
                (self.defaults.open_interest, self.defaults.funding_rate.clone())
            }
        };

        let open_interest_avg = match average {
            SourceResult::Ok { value, .. } => value,
            SourceResult::Failed { reasons } => {
                warn!(
                    chain = self.average.label(),
                    ?reasons,
                    "open interest history unavailable, using default average"
                );
                self.defaults.open_interest_avg
            }
        };

        DerivativesStats {
            open_interest,
            open_interest_avg,
            funding_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::chain::tests::Scripted;
    use std::time::Duration;

    fn ticker(oi: f64, rate: &str) -> PerpTicker {
        PerpTicker {
            open_interest: oi,
            funding_rate: rate.to_string(),
        }
    }

    fn chain<T: Send + 'static>(label: &'static str) -> SourceChain<T> {
        SourceChain::new(label, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn live_values_are_used() {
        let acq = DerivativesAcquirer::new(
            chain("t").with_source(Scripted::ok("bybit", ticker(30_000.0, "0.0001"))),
            chain("a").with_source(Scripted::ok("bybit_oi_history", 29_000.0)),
            &FallbackTable::default(),
        );
        let stats = acq.acquire().await;
        assert_eq!(stats.open_interest, 30_000.0);
        assert_eq!(stats.open_interest_avg, 29_000.0);
        assert_eq!(stats.funding_rate, "0.0001");
    }

    #[tokio::test]
    async fn zero_open_interest_falls_through() {
        let acq = DerivativesAcquirer::new(
            chain("t")
                .with_source(Scripted::ok("bybit", ticker(0.0, "0.0002")))
                .with_source(Scripted::ok("binance_futures", ticker(80_000.0, "0.0003"))),
            chain("a"),
            &FallbackTable::default(),
        );
        let stats = acq.acquire().await;
        assert_eq!(stats.open_interest, 80_000.0);
        assert_eq!(stats.funding_rate, "0.0003");
        assert_eq!(stats.open_interest_avg, 26_944.93);
    }

    #[tokio::test]
    async fn total_failure_uses_defaults() {
        let acq = DerivativesAcquirer::new(
            chain("t").with_source(Scripted::<PerpTicker>::failing("bybit")),
            chain("a").with_source(Scripted::<f64>::failing("bybit_oi_history")),
            &FallbackTable::default(),
        );
        let stats = acq.acquire().await;
        assert_eq!(stats.open_interest, 26_808.17);
        assert_eq!(stats.open_interest_avg, 26_944.93);
        assert_eq!(stats.funding_rate, "0.0000125");
    }

    #[test]
    fn production_chain_order() {
        let client = reqwest::Client::new();
        let acq = DerivativesAcquirer::from_config(&client, &ServiceConfig::default());
        assert_eq!(acq.ticker.source_names(), vec!["bybit", "binance_futures"]);
        assert_eq!(
            acq.average.source_names(),
            vec!["bybit_oi_history", "binance_oi_history"]
        );
    }
}
