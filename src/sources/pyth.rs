// =============================================================================
// Pyth Hermes — primary live price
// =============================================================================
//
// GET {base}/api/latest_price_feeds?ids[]={feed_id}
//
//   [{ "id": "...", "price": { "price": "1083185", "conf": "...",
//                              "expo": -1, "publish_time": 1718000000 } }]
//
// The price is a fixed-point mantissa scaled by a signed power of ten:
//   price = mantissa * 10^expo
// =============================================================================

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{fetch_json, json_f64, Source};
use crate::error::SourceError;

const NAME: &str = "pyth";

/// Live BTC/USD from the Pyth oracle network.
#[derive(Debug, Clone)]
pub struct PythPriceSource {
    client: reqwest::Client,
    base_url: String,
    feed_id: String,
}

impl PythPriceSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        feed_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            feed_id: feed_id.into(),
        }
    }
}

#[async_trait]
impl Source<f64> for PythPriceSource {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self) -> Result<f64, SourceError> {
        let url = format!("{}/api/latest_price_feeds", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("ids[]", self.feed_id.as_str())]);

        let body = fetch_json(NAME, request).await?;
        let price = parse_latest_price(&body)?;
        debug!(price, "pyth price fetched");
        Ok(price)
    }
}

/// Apply a signed decimal exponent to a mantissa.
///
/// Negative exponents divide by the exact power of ten rather than multiply by
/// its inexact reciprocal, so `1083185e-1` is exactly `108318.5`.
pub fn descale(mantissa: f64, expo: i32) -> f64 {
    if expo < 0 {
        mantissa / 10f64.powi(-expo)
    } else {
        mantissa * 10f64.powi(expo)
    }
}

/// Extract and descale the first feed's price from a Hermes response.
pub(crate) fn parse_latest_price(body: &Value) -> Result<f64, SourceError> {
    let feed = body
        .as_array()
        .and_then(|feeds| feeds.first())
        .ok_or_else(|| SourceError::malformed(NAME, "expected a non-empty array of feeds"))?;

    let price = feed
        .get("price")
        .filter(|p| p.is_object())
        .ok_or_else(|| SourceError::malformed(NAME, "feed has no price object"))?;

    let mantissa = price
        .get("price")
        .and_then(json_f64)
        .ok_or_else(|| SourceError::malformed(NAME, "price mantissa is not numeric"))?;

    let expo = price
        .get("expo")
        .and_then(Value::as_i64)
        .and_then(|e| i32::try_from(e).ok())
        .ok_or_else(|| SourceError::malformed(NAME, "price exponent is not an integer"))?;

    Ok(descale(mantissa, expo))
}
