// =============================================================================
// Market Snapshot — the payload served to the dashboard
// =============================================================================
//
// `assembler` turns a series + live price into indicator values, `merger`
// applies the fallback policy and freezes the result, `service` runs one
// invocation end to end.

pub mod assembler;
pub mod merger;
pub mod service;

pub use service::SnapshotService;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::types::{HistorySource, PriceSource};

/// Current-value indicators over fixed trailing windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub ema20: f64,
    pub ema50: f64,
    pub macd: f64,
    pub rsi7: f64,
    pub rsi14: f64,
    pub atr14: f64,
}

/// Growing-window indicator series over the intraday window.
#[derive(Debug, Clone, PartialEq)]
pub struct IntradaySeries {
    pub prices: Vec<f64>,
    pub ema20: Vec<f64>,
    pub macd: Vec<f64>,
    pub rsi7: Vec<f64>,
    pub rsi14: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeStats {
    pub current: f64,
    pub average: f64,
}

/// Immutable response aggregate. Field names are the wire contract.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub current_price: f64,
    pub current_ema20: f64,
    pub current_macd: f64,
    pub current_rsi_7: f64,
    pub current_rsi_14: f64,
    pub current_ema50: f64,
    pub current_atr_14: f64,

    pub open_interest: f64,
    pub open_interest_avg: f64,
    pub funding_rate: String,

    pub intraday_prices: Vec<f64>,
    pub intraday_ema20: Vec<f64>,
    pub intraday_macd: Vec<f64>,
    pub intraday_rsi_7: Vec<f64>,
    pub intraday_rsi_14: Vec<f64>,

    pub ema_20_4h: f64,
    pub ema_50_4h: f64,
    pub atr_3_4h: f64,
    pub atr_14_4h: f64,

    pub current_volume: f64,
    pub average_volume: f64,

    /// ISO-8601, millisecond precision, UTC.
    pub timestamp: String,
    pub data_source: HistorySource,
    pub price_source: PriceSource,
}

impl MarketSnapshot {
    /// Fail if any number in the payload is NaN or infinite.
    pub fn ensure_finite(&self) -> Result<()> {
        let scalars = [
            ("current_price", self.current_price),
            ("current_ema20", self.current_ema20),
            ("current_macd", self.current_macd),
            ("current_rsi_7", self.current_rsi_7),
            ("current_rsi_14", self.current_rsi_14),
            ("current_ema50", self.current_ema50),
            ("current_atr_14", self.current_atr_14),
            ("open_interest", self.open_interest),
            ("open_interest_avg", self.open_interest_avg),
            ("ema_20_4h", self.ema_20_4h),
            ("ema_50_4h", self.ema_50_4h),
            ("atr_3_4h", self.atr_3_4h),
            ("atr_14_4h", self.atr_14_4h),
            ("current_volume", self.current_volume),
            ("average_volume", self.average_volume),
        ];
        for (field, value) in scalars {
            if !value.is_finite() {
                bail!("{field} is not finite: {value}");
            }
        }

        let series = [
            ("intraday_prices", &self.intraday_prices),
            ("intraday_ema20", &self.intraday_ema20),
            ("intraday_macd", &self.intraday_macd),
            ("intraday_rsi_7", &self.intraday_rsi_7),
            ("intraday_rsi_14", &self.intraday_rsi_14),
        ];
        for (field, values) in series {
            if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                bail!("{field}[{i}] is not finite: {v}");
            }
        }

        Ok(())
    }
}
