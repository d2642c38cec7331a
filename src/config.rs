// =============================================================================
// Service Configuration — upstream endpoints, pipeline knobs, fallback table
// =============================================================================
//
// Loaded once at startup from a JSON file and then shared read-only. Every
// field carries a serde default so a partial (or absent) file still yields a
// working service.
//
// The `fallbacks` table is the single home of every canned number the
// snapshot may fall back to.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Bounds for the synthetic series starting ratio.
const START_RATIO_MIN: f64 = 0.85;
const START_RATIO_MAX: f64 = 0.98;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_estimated_range_pct() -> f64 {
    0.005
}

// =============================================================================
// SourceSettings
// =============================================================================

/// Upstream endpoints and acquisition limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub pyth_base_url: String,
    /// Pyth price feed id for BTC/USD.
    pub pyth_feed_id: String,

    pub coingecko_base_url: String,
    pub coingecko_coin_id: String,
    /// Days of market-chart history requested (2..=90 yields hourly points).
    pub coingecko_chart_days: u32,
    /// Sent as `x-cg-demo-api-key` when present. Only read from the
    /// environment, never from or to the file.
    #[serde(skip)]
    pub coingecko_api_key: Option<String>,

    pub binance_base_url: String,
    pub binance_futures_base_url: String,
    pub bybit_base_url: String,

    /// Exchange symbol for the spot, linear-perp and futures venues.
    pub symbol: String,
    pub kline_interval: String,

    /// Number of history points requested (and synthesized on failure).
    pub history_limit: usize,
    /// Real series shorter than this are rejected as insufficient.
    pub min_history_points: usize,
    /// Hourly open-interest samples averaged for `open_interest_avg`.
    pub open_interest_history_limit: usize,

    /// Budget for one source attempt inside a chain.
    pub source_timeout_ms: u64,
    /// Transport-level timeout on the shared HTTP client.
    pub http_timeout_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            pyth_base_url: "https://hermes.pyth.network".to_string(),
            pyth_feed_id: "0xe62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43"
                .to_string(),
            coingecko_base_url: "https://api.coingecko.com/api/v3".to_string(),
            coingecko_coin_id: "bitcoin".to_string(),
            coingecko_chart_days: 5,
            coingecko_api_key: None,
            binance_base_url: "https://api.binance.com".to_string(),
            binance_futures_base_url: "https://fapi.binance.com".to_string(),
            bybit_base_url: "https://api.bybit.com".to_string(),
            symbol: "BTCUSDT".to_string(),
            kline_interval: "1h".to_string(),
            history_limit: 100,
            min_history_points: 26,
            open_interest_history_limit: 24,
            source_timeout_ms: 5_000,
            http_timeout_ms: 10_000,
        }
    }
}

impl SourceSettings {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

// =============================================================================
// SyntheticSettings
// =============================================================================

/// Shape of the substitute series built when every history source fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSettings {
    /// First point as a fraction of the live price, within [0.85, 0.98].
    pub start_ratio: f64,
    /// Noise amplitude as a fraction of the live price. 0 disables noise.
    pub noise_pct: f64,
    /// RNG seed; the series is reproducible for a given price.
    pub seed: u64,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            start_ratio: 0.92,
            noise_pct: 0.02,
            seed: 0x00B7_C05D,
        }
    }
}

// =============================================================================
// SubstitutionPolicy
// =============================================================================

/// Which computed values the merger swaps for their canned default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionPolicy {
    /// Zero-like or non-finite values are replaced. Matches what existing
    /// dashboards expect, but a legitimate 0.0 (e.g. a flat MACD) is also
    /// replaced.
    Legacy,
    /// Only non-finite values are replaced.
    NonFiniteOnly,
}

impl Default for SubstitutionPolicy {
    fn default() -> Self {
        Self::Legacy
    }
}

// =============================================================================
// FallbackTable
// =============================================================================

/// Canned values keyed by the output field they stand in for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackTable {
    pub current_price: f64,
    pub current_ema20: f64,
    pub current_ema50: f64,
    pub current_macd: f64,
    pub current_rsi_7: f64,
    pub current_rsi_14: f64,
    pub current_atr_14: f64,

    pub open_interest: f64,
    pub open_interest_avg: f64,
    pub funding_rate: String,

    // 4h timeframe figures are supplied, not computed.
    pub ema_20_4h: f64,
    pub ema_50_4h: f64,
    pub atr_3_4h: f64,
    pub atr_14_4h: f64,

    pub current_volume: f64,
    pub average_volume: f64,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self {
            current_price: 108_318.5,
            current_ema20: 108_238.095,
            current_ema50: 110_266.798,
            current_macd: 140.779,
            current_rsi_7: 50.202,
            current_rsi_14: 55.032,
            current_atr_14: 896.366,
            open_interest: 26_808.17,
            open_interest_avg: 26_944.93,
            funding_rate: "0.0000125".to_string(),
            ema_20_4h: 109_085.4,
            ema_50_4h: 110_266.798,
            atr_3_4h: 809.461,
            atr_14_4h: 896.366,
            current_volume: 151.082,
            average_volume: 4_897.702,
        }
    }
}

// =============================================================================
// ServiceConfig
// =============================================================================

/// Top-level configuration for the snapshot service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub sources: SourceSettings,

    #[serde(default)]
    pub synthetic: SyntheticSettings,

    /// Half-width of the high/low band estimated around a close when the
    /// source reports no extremes (0.005 = ±0.5 %).
    #[serde(default = "default_estimated_range_pct")]
    pub estimated_range_pct: f64,

    #[serde(default)]
    pub substitution: SubstitutionPolicy,

    #[serde(default)]
    pub fallbacks: FallbackTable,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            sources: SourceSettings::default(),
            synthetic: SyntheticSettings::default(),
            estimated_range_pct: default_estimated_range_pct(),
            substitution: SubstitutionPolicy::default(),
            fallbacks: FallbackTable::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read service config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse service config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.sources.symbol,
            substitution = ?config.substitution,
            "service config loaded"
        );

        Ok(config)
    }

    /// Apply environment overrides (bind address, credentials).
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("BTC_PULSE_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
        if let Ok(key) = std::env::var("COINGECKO_API_KEY") {
            if !key.trim().is_empty() {
                self.sources.coingecko_api_key = Some(key.trim().to_string());
            }
        }
    }

    /// Clamp out-of-range knobs back into their documented bounds.
    pub fn sanitize(&mut self) {
        let ratio = self.synthetic.start_ratio;
        if !(START_RATIO_MIN..=START_RATIO_MAX).contains(&ratio) {
            let clamped = if ratio.is_finite() {
                ratio.clamp(START_RATIO_MIN, START_RATIO_MAX)
            } else {
                SyntheticSettings::default().start_ratio
            };
            warn!(ratio, clamped, "synthetic start_ratio out of range");
            self.synthetic.start_ratio = clamped;
        }

        let noise = self.synthetic.noise_pct;
        if !noise.is_finite() || noise < 0.0 {
            warn!(noise, "synthetic noise_pct invalid, disabling noise");
            self.synthetic.noise_pct = 0.0;
        }

        let range = self.estimated_range_pct;
        if !range.is_finite() || range < 0.0 || range >= 1.0 {
            warn!(range, "estimated_range_pct invalid, using default");
            self.estimated_range_pct = default_estimated_range_pct();
        }

        if self.sources.history_limit < self.sources.min_history_points {
            warn!(
                history_limit = self.sources.history_limit,
                min_history_points = self.sources.min_history_points,
                "history_limit below min_history_points, raising it"
            );
            self.sources.history_limit = self.sources.min_history_points;
        }
    }
}
