// =============================================================================
// Bybit v5 — primary derivatives stats
// =============================================================================
//
// Ticker:      GET {base}/v5/market/tickers?category=linear&symbol=
//   { "retCode": 0, "result": { "list": [{ "openInterest": "...",
//                                          "fundingRate": "..." }] } }
//
// OI history:  GET {base}/v5/market/open-interest?category=linear&symbol=
//                  &intervalTime=1h&limit=
//   { "retCode": 0, "result": { "list": [{ "openInterest": "...",
//                                          "timestamp": "..." }] } }
//
// Bybit answers HTTP 200 even for API errors; `retCode != 0` is treated as
// the venue being unavailable.
// =============================================================================

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{fetch_json, is_finite_decimal, json_f64, Source};
use crate::error::SourceError;
use crate::types::PerpTicker;

const TICKER_NAME: &str = "bybit";
const OI_HIST_NAME: &str = "bybit_oi_history";

/// Return `result.list` after checking `retCode`.
fn result_list<'a>(source_name: &'static str, body: &'a Value) -> Result<&'a [Value], SourceError> {
    match body.get("retCode").and_then(Value::as_i64) {
        Some(0) => {}
        Some(code) => {
            let msg = body.get("retMsg").and_then(Value::as_str).unwrap_or("");
            return Err(SourceError::unavailable(source_name, format!("retCode {code}: {msg}")));
        }
        None => return Err(SourceError::malformed(source_name, "missing retCode")),
    }

    body.get("result")
        .and_then(|r| r.get("list"))
        .and_then(Value::as_array)
        .filter(|list| !list.is_empty())
        .map(Vec::as_slice)
        .ok_or_else(|| SourceError::malformed(source_name, "expected a non-empty result.list"))
}

// =============================================================================
// Linear ticker
// =============================================================================

/// Open interest + funding rate from the Bybit linear-perp ticker.
#[derive(Debug, Clone)]
pub struct BybitTickerSource {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
}

impl BybitTickerSource {
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
impl Source<PerpTicker> for BybitTickerSource {
    fn name(&self) -> &'static str {
        TICKER_NAME
    }

    async fn fetch(&self) -> Result<PerpTicker, SourceError> {
        let request = self
            .client
            .get(format!("{}/v5/market/tickers", self.base_url))
            .query(&[("category", "linear"), ("symbol", self.symbol.as_str())]);

        let body = fetch_json(TICKER_NAME, request).await?;
        let ticker = parse_ticker(&body)?;
        debug!(
            symbol = %self.symbol,
            open_interest = ticker.open_interest,
            funding_rate = %ticker.funding_rate,
            "bybit ticker fetched"
        );
        Ok(ticker)
    }
}

pub(crate) fn parse_ticker(body: &Value) -> Result<PerpTicker, SourceError> {
    let entry = &result_list(TICKER_NAME, body)?[0];

    let open_interest = entry
        .get("openInterest")
        .and_then(json_f64)
        .ok_or_else(|| SourceError::malformed(TICKER_NAME, "missing numeric openInterest"))?;

    let funding_rate = entry
        .get("fundingRate")
        .and_then(Value::as_str)
        .filter(|s| is_finite_decimal(s))
        .ok_or_else(|| SourceError::malformed(TICKER_NAME, "missing numeric fundingRate"))?;

    Ok(PerpTicker {
        open_interest,
        funding_rate: funding_rate.trim().to_string(),
    })
}

// =============================================================================
// Open interest history
// =============================================================================

/// Mean open interest over the recent hourly history.
#[derive(Debug, Clone)]
pub struct BybitOpenInterestHistorySource {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
    limit: usize,
}

impl BybitOpenInterestHistorySource {
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
impl Source<f64> for BybitOpenInterestHistorySource {
    fn name(&self) -> &'static str {
        OI_HIST_NAME
    }

    async fn fetch(&self) -> Result<f64, SourceError> {
        let limit = self.limit.to_string();
        let request = self
            .client
            .get(format!("{}/v5/market/open-interest", self.base_url))
            .query(&[
                ("category", "linear"),
                ("symbol", self.symbol.as_str()),
                ("intervalTime", "1h"),
                ("limit", limit.as_str()),
            ]);

        let body = fetch_json(OI_HIST_NAME, request).await?;
        parse_open_interest_history(&body)
    }
}

pub(crate) fn parse_open_interest_history(body: &Value) -> Result<f64, SourceError> {
    let values = result_list(OI_HIST_NAME, body)?
        .iter()
        .map(|row| row.get("openInterest").and_then(json_f64))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| SourceError::malformed(OI_HIST_NAME, "row without numeric openInterest"))?;

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}
