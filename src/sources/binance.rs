// =============================================================================
// Binance REST — primary history, secondary derivatives stats
// =============================================================================
//
// Public endpoints only; nothing here is signed.
//
//   Spot klines:        GET {spot}/api/v3/klines?symbol=&interval=&limit=
//   Premium index:      GET {fapi}/fapi/v1/premiumIndex?symbol=
//   Open interest:      GET {fapi}/fapi/v1/openInterest?symbol=
//   OI history:         GET {fapi}/futures/data/openInterestHist?symbol=&period=1h&limit=
// =============================================================================

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{fetch_json, is_finite_decimal, json_f64, Source};
use crate::error::SourceError;
use crate::market_data::OhlcSeries;
use crate::types::PerpTicker;

const KLINES_NAME: &str = "binance";
const FUTURES_NAME: &str = "binance_futures";
const OI_HIST_NAME: &str = "binance_oi_history";

/// Minimum kline arity: [openTime, open, high, low, close, volume, ...].
const KLINE_MIN_FIELDS: usize = 6;

// =============================================================================
// Spot klines
// =============================================================================

/// OHLCV history from the Binance spot kline endpoint.
#[derive(Clone)]
pub struct BinanceKlineSource {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
    interval: String,
    limit: usize,
}

impl BinanceKlineSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        limit: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            symbol: symbol.into(),
            interval: interval.into(),
            limit,
        }
    }
}

#[async_trait]
impl Source<OhlcSeries> for BinanceKlineSource {
    fn name(&self) -> &'static str {
        KLINES_NAME
    }

    async fn fetch(&self) -> Result<OhlcSeries, SourceError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = self.limit.to_string();
        let request = self.client.get(&url).query(&[
            ("symbol", self.symbol.as_str()),
            ("interval", self.interval.as_str()),
            ("limit", limit.as_str()),
        ]);

        let body = fetch_json(KLINES_NAME, request).await?;
        let series = parse_klines(&body)?;
        debug!(
            symbol = %self.symbol,
            interval = %self.interval,
            count = series.len(),
            "klines fetched"
        );
        Ok(series)
    }
}

impl std::fmt::Debug for BinanceKlineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceKlineSource")
            .field("base_url", &self.base_url)
            .field("symbol", &self.symbol)
            .field("interval", &self.interval)
            .field("limit", &self.limit)
            .finish()
    }
}

/// Parse Binance's array-of-arrays kline format.
///
/// Array indices:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume, ...
///
/// A single malformed entry fails the whole response.
pub(crate) fn parse_klines(body: &Value) -> Result<OhlcSeries, SourceError> {
    let raw = body
        .as_array()
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| {
            SourceError::malformed(KLINES_NAME, "expected a non-empty array of klines")
        })?;

    let n = raw.len();
    let mut closes = Vec::with_capacity(n);
    let mut highs = Vec::with_capacity(n);
    let mut lows = Vec::with_capacity(n);
    let mut volumes = Vec::with_capacity(n);

    for (i, entry) in raw.iter().enumerate() {
        let arr = entry
            .as_array()
            .filter(|arr| arr.len() >= KLINE_MIN_FIELDS)
            .ok_or_else(|| {
                SourceError::malformed(
                    KLINES_NAME,
                    format!("kline {i} is not an array of >= 6 fields"),
                )
            })?;

        let field = |idx: usize, what: &str| {
            json_f64(&arr[idx]).ok_or_else(|| {
                SourceError::malformed(KLINES_NAME, format!("kline {i} has a non-numeric {what}"))
            })
        };

        highs.push(field(2, "high")?);
        lows.push(field(3, "low")?);
        closes.push(field(4, "close")?);
        volumes.push(field(5, "volume")?);
    }

    Ok(OhlcSeries::observed(closes, highs, lows, Some(volumes)))
}

// =============================================================================
// USDⓈ-M futures
// =============================================================================

/// Open interest + last funding rate from the Binance futures API.
#[derive(Debug, Clone)]
pub struct BinanceFuturesSource {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
}

impl BinanceFuturesSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            symbol: symbol.into(),
        }
    }
}

#[async_trait]
impl Source<PerpTicker> for BinanceFuturesSource {
    fn name(&self) -> &'static str {
        FUTURES_NAME
    }

    async fn fetch(&self) -> Result<PerpTicker, SourceError> {
        let symbol = [("symbol", self.symbol.as_str())];

        let premium = fetch_json(
            FUTURES_NAME,
            self.client
                .get(format!("{}/fapi/v1/premiumIndex", self.base_url))
                .query(&symbol),
        )
        .await?;
        let open_interest = fetch_json(
            FUTURES_NAME,
            self.client
                .get(format!("{}/fapi/v1/openInterest", self.base_url))
                .query(&symbol),
        )
        .await?;

        let ticker = parse_futures(&premium, &open_interest)?;
        debug!(
            symbol = %self.symbol,
            open_interest = ticker.open_interest,
            funding_rate = %ticker.funding_rate,
            "binance futures stats fetched"
        );
        Ok(ticker)
    }
}

pub(crate) fn parse_futures(
    premium: &Value,
    open_interest: &Value,
) -> Result<PerpTicker, SourceError> {
    let funding_rate = premium
        .get("lastFundingRate")
        .and_then(Value::as_str)
        .filter(|s| is_finite_decimal(s))
        .ok_or_else(|| SourceError::malformed(FUTURES_NAME, "missing numeric lastFundingRate"))?;

    let oi = open_interest
        .get("openInterest")
        .and_then(json_f64)
        .ok_or_else(|| SourceError::malformed(FUTURES_NAME, "missing numeric openInterest"))?;

    Ok(PerpTicker {
        open_interest: oi,
        funding_rate: funding_rate.trim().to_string(),
    })
}

/// Mean open interest over the recent hourly history.
#[derive(Debug, Clone)]
pub struct BinanceOpenInterestHistorySource {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
    limit: usize,
}

impl BinanceOpenInterestHistorySource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        limit: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            symbol: symbol.into(),
            limit,
        }
    }
}

#[async_trait]
impl Source<f64> for BinanceOpenInterestHistorySource {
    fn name(&self) -> &'static str {
        OI_HIST_NAME
    }

    async fn fetch(&self) -> Result<f64, SourceError> {
        let limit = self.limit.to_string();
        let request = self
            .client
            .get(format!("{}/futures/data/openInterestHist", self.base_url))
            .query(&[
                ("symbol", self.symbol.as_str()),
                ("period", "1h"),
                ("limit", limit.as_str()),
            ]);

        let body = fetch_json(OI_HIST_NAME, request).await?;
        parse_open_interest_history(&body)
    }
}

pub(crate) fn parse_open_interest_history(body: &Value) -> Result<f64, SourceError> {
    let rows = body
        .as_array()
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| SourceError::malformed(OI_HIST_NAME, "expected a non-empty array"))?;

    let values = rows
        .iter()
        .map(|row| row.get("sumOpenInterest").and_then(json_f64))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| {
            SourceError::malformed(OI_HIST_NAME, "row without numeric sumOpenInterest")
        })?;

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}
