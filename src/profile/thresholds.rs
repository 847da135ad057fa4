//! Calibrated decision thresholds from the human validation set.

use super::stats::quantile_sorted;
use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedThresholds {
    #[serde(alias = "human_variability_95th")]
    pub human_95th_percentile: f64,
    #[serde(alias = "human_variability_99th")]
    pub human_99th_percentile: f64,
    /// Operative decision threshold
    pub recommended_threshold: f64,
}

impl CalibratedThresholds {
    /// Percentiles of final anomaly scores observed on held-out human samples.
    pub fn calibrate(scores: &[f64]) -> Result<Self> {
        if scores.is_empty() {
            return Err(DetectorError::Calibration("empty validation set".into()));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(DetectorError::Calibration("non-finite validation score".into()));
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let p95 = quantile_sorted(&sorted, 0.95);
        let p99 = quantile_sorted(&sorted, 0.99);
        let thresholds = Self {
            human_95th_percentile: p95,
            human_99th_percentile: p99,
            recommended_threshold: p95,
        };
        thresholds
            .validate()
            .map_err(|e| DetectorError::Calibration(format!("degenerate validation set: {}", e)))?;
        tracing::info!(samples = scores.len(), p95, p99, "thresholds calibrated");
        Ok(thresholds)
    }

    /// Threshold used by the decision engine.
    pub fn threshold(&self) -> f64 {
        self.recommended_threshold
    }

    pub fn validate(&self) -> Result<()> {
        let values = [
            self.human_95th_percentile,
            self.human_99th_percentile,
            self.recommended_threshold,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DetectorError::Configuration("thresholds must be finite".into()));
        }
        if self.recommended_threshold <= 0.0 {
            return Err(DetectorError::Configuration(format!(
                "recommended_threshold must be positive, got {}",
                self.recommended_threshold
            )));
        }
        if self.human_95th_percentile > self.human_99th_percentile {
            return Err(DetectorError::Configuration(format!(
                "95th percentile {} exceeds 99th percentile {}",
                self.human_95th_percentile, self.human_99th_percentile
            )));
        }
        Ok(())
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let t: Self = serde_json::from_str(data)
            .map_err(|e| DetectorError::Configuration(format!("malformed thresholds: {}", e)))?;
        t.validate()?;
        Ok(t)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            DetectorError::Configuration(format!("thresholds {}: {}", path.display(), e))
        })?;
        let t = Self::from_json(&data)?;
        tracing::info!(
            path = %path.display(),
            threshold = t.recommended_threshold,
            p99 = t.human_99th_percentile,
            "thresholds loaded"
        );
        Ok(t)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
