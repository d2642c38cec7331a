// =============================================================================
// Central Application State — BTC Pulse
// =============================================================================
//
// Shared across request handlers via `Arc<AppState>`. The snapshot pipeline
// itself is stateless; the only mutable data are the service counters read by
// the health endpoint, kept behind a parking_lot::RwLock.
// =============================================================================

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::snapshot::SnapshotService;
use crate::types::HistorySource;

/// Counters exposed on `/api/v1/health`. Never read by the pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceStats {
    /// Snapshots served successfully since startup.
    pub served: u64,
    /// Invocations that ended in an internal error.
    pub failed: u64,
    pub last_data_source: Option<HistorySource>,
    /// ISO 8601 timestamp of the last successful snapshot.
    pub last_served_at: Option<String>,
}

pub struct AppState {
    pub config: ServiceConfig,
    pub service: SnapshotService,
    pub stats: RwLock<ServiceStats>,
    /// Instant when the service was started. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: ServiceConfig, service: SnapshotService) -> Self {
        Self {
            config,
            service,
            stats: RwLock::new(ServiceStats::default()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn record_served(&self, source: HistorySource) {
        let mut stats = self.stats.write();
        stats.served += 1;
        stats.last_data_source = Some(source);
        stats.last_served_at = Some(Utc::now().to_rfc3339());
    }

    pub fn record_failure(&self) {
        self.stats.write().failed += 1;
    }

    pub fn stats(&self) -> ServiceStats {
        self.stats.read().clone()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        let config = ServiceConfig::default();
        let service = SnapshotService::from_config(&reqwest::Client::new(), &config);
        AppState::new(config, service)
    }

    #[test]
    fn counters_start_empty() {
        let s = state().stats();
        assert_eq!(s.served, 0);
        assert_eq!(s.failed, 0);
        assert!(s.last_data_source.is_none());
    }

    #[test]
    fn record_served_tracks_last_source() {
        let st = state();
        st.record_served(HistorySource::Binance);
        st.record_served(HistorySource::Synthetic);
        st.record_failure();
        let s = st.stats();
        assert_eq!(s.served, 2);
        assert_eq!(s.failed, 1);
        assert_eq!(s.last_data_source, Some(HistorySource::Synthetic));
        assert!(s.last_served_at.is_some());
    }
}
