// =============================================================================
// Market Data Acquisition
// =============================================================================
//
// Each acquirer wraps one or more source chains and always returns a value:
// live data when any source succeeds, a documented fallback otherwise.

pub mod derivatives;
pub mod history;
pub mod price;
pub mod series;
pub mod synthetic;

pub use derivatives::DerivativesAcquirer;
pub use history::{History, HistoryAcquirer, INTRADAY_LEN};
pub use price::PriceAcquirer;
pub use series::OhlcSeries;
pub use synthetic::synthesize;
