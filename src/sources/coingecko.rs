// =============================================================================
// CoinGecko — secondary live price and secondary history
// =============================================================================
//
// Spot:    GET {base}/simple/price?ids={coin}&vs_currencies=usd
//          { "bitcoin": { "usd": 108318.5 } }
//
// History: GET {base}/coins/{coin}/market_chart?vs_currency=usd&days={days}
//          { "prices": [[1718000000000, 108318.5], ...], "total_volumes": ... }
//
// The chart has no bar extremes, so highs/lows are estimated around each
// close and the series is flagged accordingly. `total_volumes` is quoted in
// USD, not BTC, and is deliberately not used as bar volume.
// =============================================================================

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{fetch_json, json_f64, Source};
use crate::error::SourceError;
use crate::market_data::OhlcSeries;

const SPOT_NAME: &str = "coingecko";
const CHART_NAME: &str = "coingecko_chart";

/// Shared request construction for both endpoints.
#[derive(Debug, Clone)]
struct CoinGeckoApi {
    client: reqwest::Client,
    base_url: String,
    coin_id: String,
    api_key: Option<String>,
}

impl CoinGeckoApi {
    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.header("x-cg-demo-api-key", key),
            None => request,
        }
    }
}

// =============================================================================
// Spot price
// =============================================================================

/// Live BTC/USD from CoinGecko's simple price endpoint.
#[derive(Debug, Clone)]
pub struct CoinGeckoSpotSource {
    api: CoinGeckoApi,
}

impl CoinGeckoSpotSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        coin_id: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            api: CoinGeckoApi {
                client,
                base_url: base_url.into(),
                coin_id: coin_id.into(),
                api_key,
            },
        }
    }
}

#[async_trait]
impl Source<f64> for CoinGeckoSpotSource {
    fn name(&self) -> &'static str {
        SPOT_NAME
    }

    async fn fetch(&self) -> Result<f64, SourceError> {
        let request = self.api.get("/simple/price").query(&[
            ("ids", self.api.coin_id.as_str()),
            ("vs_currencies", "usd"),
        ]);
        let body = fetch_json(SPOT_NAME, request).await?;
        let price = parse_simple_price(&body, &self.api.coin_id)?;
        debug!(price, "coingecko spot price fetched");
        Ok(price)
    }
}

pub(crate) fn parse_simple_price(body: &Value, coin_id: &str) -> Result<f64, SourceError> {
    body.get(coin_id)
        .and_then(|coin| coin.get("usd"))
        .and_then(json_f64)
        .ok_or_else(|| SourceError::malformed(SPOT_NAME, format!("missing numeric {coin_id}.usd")))
}

// =============================================================================
// Market chart
// =============================================================================

/// Hourly close history from CoinGecko's market chart.
#[derive(Debug, Clone)]
pub struct CoinGeckoChartSource {
    api: CoinGeckoApi,
    days: u32,
    limit: usize,
    range_pct: f64,
}

impl CoinGeckoChartSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        coin_id: impl Into<String>,
        api_key: Option<String>,
        days: u32,
        limit: usize,
        range_pct: f64,
    ) -> Self {
        Self {
            api: CoinGeckoApi {
                client,
                base_url: base_url.into(),
                coin_id: coin_id.into(),
                api_key,
            },
            days,
            limit,
            range_pct,
        }
    }
}

#[async_trait]
impl Source<OhlcSeries> for CoinGeckoChartSource {
    fn name(&self) -> &'static str {
        CHART_NAME
    }

    async fn fetch(&self) -> Result<OhlcSeries, SourceError> {
        let path = format!("/coins/{}/market_chart", self.api.coin_id);
        let days = self.days.to_string();
        let request = self
            .api
            .get(&path)
            .query(&[("vs_currency", "usd"), ("days", days.as_str())]);

        let body = fetch_json(CHART_NAME, request).await?;
        let mut closes = parse_market_chart(&body)?;
        if closes.len() > self.limit {
            closes.drain(..closes.len() - self.limit);
        }

        debug!(count = closes.len(), "coingecko market chart fetched");
        Ok(OhlcSeries::with_estimated_extremes(closes, self.range_pct))
    }
}

/// Extract closes from `prices: [[timestamp, price], ...]`.
///
/// Every element must be a two-element array with a numeric price; a single
/// bad element fails the whole response.
pub(crate) fn parse_market_chart(body: &Value) -> Result<Vec<f64>, SourceError> {
    let points = body
        .get("prices")
        .and_then(Value::as_array)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| SourceError::malformed(CHART_NAME, "expected a non-empty prices array"))?;

    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let pair = point
                .as_array()
                .filter(|pair| pair.len() == 2)
                .ok_or_else(|| {
                    SourceError::malformed(
                        CHART_NAME,
                        format!("point {i} is not a [time, price] pair"),
                    )
                })?;
            json_f64(&pair[1]).ok_or_else(|| {
                SourceError::malformed(CHART_NAME, format!("point {i} has a non-numeric price"))
            })
        })
        .collect()
}
