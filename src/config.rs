//! Detector configuration. Profile and thresholds are produced offline and referenced by path.

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Baseline profile learned from the human corpus
    pub profile_path: PathBuf,
    /// Calibrated thresholds from the human validation set
    pub thresholds_path: PathBuf,
    /// Frame and analysis parameters for feature extraction
    pub features: FeaturesConfig,
    /// Decision engine calibration constants
    pub decision: DecisionConfig,
    /// Per-request input limits
    pub limits: LimitsConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Expected input sample rate (Hz)
    pub sample_rate: u32,
    /// Analysis frame length in samples (also the FFT size)
    pub frame_length: usize,
    /// Hop between consecutive frames in samples
    pub hop_length: usize,
    /// Mel bands feeding the cepstral coefficients
    pub n_mels: usize,
    /// Lowest F0 considered voiced (Hz)
    pub fmin_hz: f64,
    /// Highest F0 considered voiced (Hz)
    pub fmax_hz: f64,
    /// YIN dip below which a frame counts as periodic
    pub voicing_threshold: f64,
    /// Frames quieter than this RMS are never voiced
    pub voicing_rms_floor: f64,
    /// Fraction of spectral magnitude below the rolloff frequency
    pub rolloff_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Below this reliability an above-threshold score is UNCERTAIN
    pub min_reliability: f64,
    /// Category mean |z| counted as an independent deviation
    pub agreement_sigma: f64,
    /// Category mean |z| reported as a mild deviation
    pub mild_sigma: f64,
    /// Jitter/shimmer |z| named explicitly in the prosodic explanation
    pub marker_sigma: f64,
    /// Scores above threshold * this are HIGH risk
    pub medium_risk_multiplier: f64,
    /// Number of strongest per-feature deviations carried in the record
    pub top_deviations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Inputs shorter than this are rejected as insufficient
    pub min_duration_secs: f64,
    /// Concurrent analyses in batch mode; 0 = available parallelism
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            profile_path: PathBuf::from("reports/human_feature_profile.json"),
            thresholds_path: PathBuf::from("reports/human_anomaly_thresholds.json"),
            features: FeaturesConfig::default(),
            decision: DecisionConfig::default(),
            limits: LimitsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_length: 2048,
            hop_length: 512,
            n_mels: 128,
            fmin_hz: 65.4,
            fmax_hz: 2093.0,
            voicing_threshold: 0.15,
            voicing_rms_floor: 1e-4,
            rolloff_percent: 0.85,
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            min_reliability: 0.7,
            agreement_sigma: 1.5,
            mild_sigma: 1.0,
            marker_sigma: 2.0,
            medium_risk_multiplier: 1.5,
            top_deviations: 5,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: 0.3,
            max_concurrency: 0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl LimitsConfig {
    /// Resolved worker count for batch analysis.
    pub fn concurrency(&self) -> usize {
        if self.max_concurrency > 0 {
            return self.max_concurrency;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

impl DetectorConfig {
    /// Load from JSON file if present; a missing file yields the defaults.
    /// A file that exists but cannot be read or parsed is a configuration error.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|e| {
            DetectorError::Configuration(format!("config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            DetectorError::Configuration(format!("malformed config {}: {}", path.display(), e))
        })
    }
}
