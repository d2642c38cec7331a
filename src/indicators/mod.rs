// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators reported on the
// dashboard. None of them fail: short or degenerate input degrades to a
// documented neutral value so a snapshot can always be produced.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;

pub use atr::calculate_atr;
pub use ema::ema_or;
pub use macd::{calculate_macd, MACD_NEUTRAL};
pub use rsi::{calculate_rsi, rsi_zone, RSI_NEUTRAL};
