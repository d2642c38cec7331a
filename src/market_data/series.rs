use serde::Serialize;

use crate::error::SourceError;

/// Whether the highs/lows of a series are real bar extremes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Extremes {
    Observed,
    /// Derived from the close by a fixed percentage band; not real extremes.
    Estimated,
}

/// Chronological OHLC history with parallel vectors (oldest first).
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcSeries {
    pub closes: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    /// Base-asset volume per bar, when the source reports it.
    pub volumes: Option<Vec<f64>>,
    pub extremes: Extremes,
}

impl OhlcSeries {
    /// Series with real highs and lows.
    pub fn observed(
        closes: Vec<f64>,
        highs: Vec<f64>,
        lows: Vec<f64>,
        volumes: Option<Vec<f64>>,
    ) -> Self {
        Self {
            closes,
            highs,
            lows,
            volumes,
            extremes: Extremes::Observed,
        }
    }

    /// Series from closes only; highs/lows are `close * (1 ± range_pct)`.
    pub fn with_estimated_extremes(closes: Vec<f64>, range_pct: f64) -> Self {
        let highs = closes.iter().map(|c| c * (1.0 + range_pct)).collect();
        let lows = closes.iter().map(|c| c * (1.0 - range_pct)).collect();
        Self {
            closes,
            highs,
            lows,
            volumes: None,
            extremes: Extremes::Estimated,
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    #[cfg(test)]
    pub fn last_close(&self) -> Option<f64> {
        self.closes.last().copied()
    }

    /// The trailing `n` closes (all of them when `n` exceeds the length).
    pub fn tail_closes(&self, n: usize) -> &[f64] {
        &self.closes[self.closes.len().saturating_sub(n)..]
    }

    /// The trailing `n` bars as parallel `(highs, lows, closes)` slices.
    pub fn tail(&self, n: usize) -> (&[f64], &[f64], &[f64]) {
        let start = self.closes.len().saturating_sub(n);
        (&self.highs[start..], &self.lows[start..], &self.closes[start..])
    }

    /// Drop everything but the trailing `n` bars.
    pub fn truncate_front(&mut self, n: usize) {
        let start = self.closes.len().saturating_sub(n);
        if start == 0 {
            return;
        }
        self.closes.drain(..start);
        self.highs.drain(..start);
        self.lows.drain(..start);
        if let Some(volumes) = self.volumes.as_mut() {
            volumes.drain(..start);
        }
    }

    /// Acceptance rule for a real (non-synthetic) series: long enough,
    /// parallel vectors aligned, and every close a finite positive price.
    pub fn validate(&self, source_name: &str, min_points: usize) -> Result<(), SourceError> {
        if self.len() < min_points {
            return Err(SourceError::InsufficientData {
                source_name: source_name.to_string(),
                got: self.len(),
                need: min_points,
            });
        }

        let n = self.len();
        let volumes_aligned = self.volumes.as_ref().map_or(true, |v| v.len() == n);
        if self.highs.len() != n || self.lows.len() != n || !volumes_aligned {
            return Err(SourceError::malformed(source_name, "parallel series lengths differ"));
        }

        if let Some(bad) = self.closes.iter().find(|c| !c.is_finite() || **c <= 0.0) {
            return Err(SourceError::Rejected {
                source_name: source_name.to_string(),
                reason: format!("close {bad} is not a positive price"),
            });
        }

        Ok(())
    }
}
