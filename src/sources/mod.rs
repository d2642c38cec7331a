// =============================================================================
// Upstream Sources
// =============================================================================
//
// One adapter per upstream endpoint. Each adapter owns its URL, performs the
// request through the shared `reqwest::Client`, and turns the body into a
// typed value through an explicit parse step that rejects any unexpected
// shape. Adapters are composed into fallback chains by `market_data`.

pub mod binance;
pub mod bybit;
pub mod chain;
pub mod coingecko;
pub mod pyth;

pub use chain::{Source, SourceChain, SourceResult};

use anyhow::{Context, Result};
use reqwest::RequestBuilder;
use serde_json::Value;

use crate::config::SourceSettings;
use crate::error::SourceError;

/// Build the HTTP client shared by every source.
pub fn build_http_client(settings: &SourceSettings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(settings.http_timeout())
        .user_agent(concat!("btc-pulse/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build reqwest client")
}

/// Send `request` and decode a JSON body, mapping transport and status
/// failures to [`SourceError::SourceUnavailable`].
pub(crate) async fn fetch_json(
    source_name: &'static str,
    request: RequestBuilder,
) -> Result<Value, SourceError> {
    let resp = request
        .send()
        .await
        .map_err(|e| SourceError::unavailable(source_name, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::unavailable(source_name, format!("HTTP {status}")));
    }

    resp.json::<Value>()
        .await
        .map_err(|e| SourceError::malformed(source_name, format!("body is not JSON: {e}")))
}

/// Read a JSON value that may be either a numeric string or a number.
/// "NaN" and "inf" strings parse as `f64` but are rejected here.
pub(crate) fn json_f64(val: &Value) -> Option<f64> {
    let v = match val {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    v.filter(|v| v.is_finite())
}

/// True when `s` is a decimal string with a finite value.
pub(crate) fn is_finite_decimal(s: &str) -> bool {
    s.trim().parse::<f64>().is_ok_and(f64::is_finite)
}
