// =============================================================================
// History Acquirer — OHLC series for the indicator engine
// =============================================================================
//
// Chain: Binance klines -> CoinGecko market chart -> synthetic series.
//
// Real attempts do not depend on the live price and may run concurrently with
// the price chain; only the synthetic fallback needs the price as its anchor,
// hence the split between `fetch_real` and `resolve`.
// =============================================================================

use tracing::{info, warn};

use super::{synthesize, OhlcSeries};
use crate::config::{ServiceConfig, SyntheticSettings};
use crate::sources::binance::BinanceKlineSource;
use crate::sources::coingecko::CoinGeckoChartSource;
use crate::sources::{SourceChain, SourceResult};
use crate::types::HistorySource;

/// Intraday window length; real series shorter than this are never accepted.
pub const INTRADAY_LEN: usize = 10;

/// The series that survived acquisition, with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub series: OhlcSeries,
    pub source: HistorySource,
}

pub struct HistoryAcquirer {
    chain: SourceChain<OhlcSeries>,
    limit: usize,
    synthetic: SyntheticSettings,
    range_pct: f64,
}

impl HistoryAcquirer {
    /// Wrap an arbitrary chain; the series validator is installed here.
    pub fn new(
        chain: SourceChain<OhlcSeries>,
        limit: usize,
        min_points: usize,
        synthetic: SyntheticSettings,
        range_pct: f64,
    ) -> Self {
        let need = min_points.max(INTRADAY_LEN);
        Self {
            chain: chain
                .with_validator(move |name, series: &OhlcSeries| series.validate(name, need)),
            limit: limit.max(need),
            synthetic,
            range_pct,
        }
    }

    /// Production chain: Binance klines, then CoinGecko market chart.
    pub fn from_config(client: &reqwest::Client, config: &ServiceConfig) -> Self {
        let s = &config.sources;
        let chain = SourceChain::new("history", s.source_timeout())
            .with_source(BinanceKlineSource::new(
                client.clone(),
                &s.binance_base_url,
                &s.symbol,
                &s.kline_interval,
                s.history_limit,
            ))
            .with_source(CoinGeckoChartSource::new(
                client.clone(),
                &s.coingecko_base_url,
                &s.coingecko_coin_id,
                s.coingecko_api_key.clone(),
                s.coingecko_chart_days,
                s.history_limit,
                config.estimated_range_pct,
            ));
        Self::new(
            chain,
            s.history_limit,
            s.min_history_points,
            config.synthetic.clone(),
            config.estimated_range_pct,
        )
    }

    /// Run the real sources only. `None` when every one of them failed.
    pub async fn fetch_real(&self) -> Option<History> {
        match self.chain.run().await {
            SourceResult::Ok { value: mut series, source } => {
                series.truncate_front(self.limit);
                let source = history_source(source);
                info!(
                    %source,
                    points = series.len(),
                    extremes = ?series.extremes,
                    "history acquired"
                );
                Some(History { series, source })
            }
            SourceResult::Failed { reasons } => {
                warn!(?reasons, "every history source failed");
                None
            }
        }
    }

    /// Use the real history if there is one, otherwise synthesize around
    /// `price`.
    pub fn resolve(&self, real: Option<History>, price: f64) -> History {
        real.unwrap_or_else(|| {
            warn!(
                price,
                points = self.limit,
                "serving SYNTHETIC history, indicators carry no market information"
            );
            History {
                series: synthesize(price, self.limit, &self.synthetic, self.range_pct),
                source: HistorySource::Synthetic,
            }
        })
    }
}

fn history_source(name: &str) -> HistorySource {
    match name {
        "binance" => HistorySource::Binance,
        _ => HistorySource::Coingecko,
    }
}
