// =============================================================================
// Shared types used across the BTC Pulse service
// =============================================================================

use serde::{Deserialize, Serialize};

/// Where the live price in a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Pyth,
    Coingecko,
    /// Every price source failed; the configured constant was used.
    Fallback,
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pyth => write!(f, "pyth"),
            Self::Coingecko => write!(f, "coingecko"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Where the historical series behind the indicators came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Binance,
    Coingecko,
    /// Every history source failed; the series was synthesized around the
    /// live price and the indicators carry no market information.
    Synthetic,
}

impl HistorySource {
    pub fn is_synthetic(self) -> bool {
        self == Self::Synthetic
    }
}

impl std::fmt::Display for HistorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binance => write!(f, "binance"),
            Self::Coingecko => write!(f, "coingecko"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Live price together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivePrice {
    pub value: f64,
    pub source: PriceSource,
}

/// Open interest and funding rate as reported by one derivatives venue.
#[derive(Debug, Clone, PartialEq)]
pub struct PerpTicker {
    pub open_interest: f64,
    pub funding_rate: String,
}

/// Perpetual-futures stats for the derivatives section of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativesStats {
    /// Outstanding contracts, in BTC.
    pub open_interest: f64,
    /// Mean open interest over the recent history window.
    pub open_interest_avg: f64,
    /// Current funding rate as the decimal string the venue reports.
    pub funding_rate: String,
}
