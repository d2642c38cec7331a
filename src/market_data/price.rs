// =============================================================================
// Price Acquirer — one live BTC/USD price, always
// =============================================================================
//
// Chain: Pyth oracle -> CoinGecko simple price -> configured constant.
// =============================================================================

use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::SourceError;
use crate::sources::coingecko::CoinGeckoSpotSource;
use crate::sources::pyth::PythPriceSource;
use crate::sources::{SourceChain, SourceResult};
use crate::types::{LivePrice, PriceSource};

pub struct PriceAcquirer {
    chain: SourceChain<f64>,
    fallback: f64,
}

/// A usable price is finite and strictly positive.
fn validate_price(source_name: &'static str, price: &f64) -> Result<(), SourceError> {
    if price.is_finite() && *price > 0.0 {
        Ok(())
    } else {
        Err(SourceError::Rejected {
            source_name: source_name.to_string(),
            reason: format!("price {price} is not a positive number"),
        })
    }
}

impl PriceAcquirer {
    /// Wrap an arbitrary chain; the price validator is installed here.
    pub fn new(chain: SourceChain<f64>, fallback: f64) -> Self {
        Self {
            chain: chain.with_validator(validate_price),
            fallback,
        }
    }

    /// Production chain: Pyth, then CoinGecko.
    pub fn from_config(client: &reqwest::Client, config: &ServiceConfig) -> Self {
        let s = &config.sources;
        let chain = SourceChain::new("price", s.source_timeout())
            .with_source(PythPriceSource::new(
                client.clone(),
                &s.pyth_base_url,
                &s.pyth_feed_id,
            ))
            .with_source(CoinGeckoSpotSource::new(
                client.clone(),
                &s.coingecko_base_url,
                &s.coingecko_coin_id,
                s.coingecko_api_key.clone(),
            ));
        Self::new(chain, config.fallbacks.current_price)
    }

    pub async fn acquire(&self) -> LivePrice {
        match self.chain.run().await {
            SourceResult::Ok { value, source } => {
                let source = price_source(source);
                info!(price = value, %source, "live price acquired");
                LivePrice { value, source }
            }
            SourceResult::Failed { reasons } => {
                warn!(
                    fallback = self.fallback,
                    ?reasons,
                    "every price source failed, using fallback price"
                );
                LivePrice {
                    value: self.fallback,
                    source: PriceSource::Fallback,
                }
            }
        }
    }
}

fn price_source(name: &str) -> PriceSource {
    match name {
        "pyth" => PriceSource::Pyth,
        _ => PriceSource::Coingecko,
    }
}
