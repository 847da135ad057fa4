//! End-to-end detector: extraction with quality hints → scoring → decision,
//! over an immutable snapshot that can be swapped at runtime.

use crate::config::DetectorConfig;
use crate::error::{DetectorError, Result};
use crate::features::{FeatureExtractor, FeatureVector, SignalQuality};
use crate::profile::{BaselineProfile, CalibratedThresholds};
use crate::risk::{AnomalyScorer, Classification, DecisionEngine, DecisionRecord, DeviationReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Profile, thresholds and the components built from them. Never mutated;
/// replaced wholesale on reload.
pub struct DetectorState {
    pub scorer: AnomalyScorer,
    pub engine: DecisionEngine,
}

impl DetectorState {
    fn build(config: &DetectorConfig, profile: BaselineProfile, thresholds: CalibratedThresholds) -> Result<Self> {
        Ok(Self {
            scorer: AnomalyScorer::new(Arc::new(profile)),
            engine: DecisionEngine::new(thresholds, config.decision.clone())?,
        })
    }

    pub fn evaluate(&self, features: &FeatureVector, quality: SignalQuality) -> (DeviationReport, DecisionRecord) {
        let report = self.scorer.score(features, quality.snr_db, quality.duration_secs);
        let decision = self.engine.decide_report(&report);
        (report, decision)
    }
}

/// Result of analysing one recording.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub quality: SignalQuality,
    pub features: FeatureVector,
    pub deviation: DeviationReport,
    pub decision: DecisionRecord,
}

pub struct VoiceDetector {
    config: DetectorConfig,
    extractor: FeatureExtractor,
    state: RwLock<Arc<DetectorState>>,
}

impl VoiceDetector {
    pub fn new(config: DetectorConfig, profile: BaselineProfile, thresholds: CalibratedThresholds) -> Result<Self> {
        let extractor = FeatureExtractor::new(config.features.clone())?;
        let state = DetectorState::build(&config, profile, thresholds)?;
        Ok(Self {
            config,
            extractor,
            state: RwLock::new(Arc::new(state)),
        })
    }

    /// Load profile and thresholds from the paths in `config`.
    pub fn from_config(config: DetectorConfig) -> Result<Self> {
        let profile = BaselineProfile::load(&config.profile_path)?;
        let thresholds = CalibratedThresholds::load(&config.thresholds_path)?;
        Self::new(config, profile, thresholds)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Current snapshot. Callers holding it are unaffected by later reloads.
    pub fn snapshot(&self) -> Arc<DetectorState> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Swap in a new profile and thresholds. On error the old snapshot stays.
    pub fn reload(&self, profile: BaselineProfile, thresholds: CalibratedThresholds) -> Result<()> {
        let digest = profile.digest();
        let next = Arc::new(DetectorState::build(&self.config, profile, thresholds)?);
        let threshold = next.engine.threshold();
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
        info!(profile_digest = %digest, threshold, "detector state reloaded");
        Ok(())
    }

    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> Result<Analysis> {
        if samples.is_empty() {
            return Err(DetectorError::EmptySignal);
        }
        check_duration(samples.len(), sample_rate, self.config.limits.min_duration_secs)?;
        let (features, quality) = self.extractor.extract_with_quality(samples, sample_rate)?;
        let (deviation, decision) = self.snapshot().evaluate(&features, quality);

        let analysis = Analysis {
            id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            quality,
            features,
            deviation,
            decision,
        };
        log_decision(&analysis);
        Ok(analysis)
    }

    /// Score and decide a vector extracted elsewhere.
    pub fn score_features(&self, features: &FeatureVector, quality: SignalQuality) -> (DeviationReport, DecisionRecord) {
        self.snapshot().evaluate(features, quality)
    }
}

/// Reject inputs shorter than `min_secs` before any spectral work.
pub fn check_duration(n_samples: usize, sample_rate: u32, min_secs: f64) -> Result<()> {
    let secs = if sample_rate == 0 { 0.0 } else { n_samples as f64 / sample_rate as f64 };
    if secs < min_secs {
        return Err(DetectorError::InsufficientSignal(format!(
            "{:.3}s of audio, need at least {}s",
            secs, min_secs
        )));
    }
    Ok(())
}

fn log_decision(a: &Analysis) {
    let d = &a.decision;
    if d.classification == Classification::Human {
        debug!(
            analysis_id = %a.id,
            score = d.anomaly_score,
            confidence = d.confidence,
            "analysis complete"
        );
    } else {
        info!(
            analysis_id = %a.id,
            classification = %d.classification,
            score = d.anomaly_score,
            reliability = d.reliability,
            risk = ?d.risk_level,
            "voice flagged"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureKey;
    use crate::profile::FeatureStats;

    fn thresholds(t: f64) -> CalibratedThresholds {
        CalibratedThresholds {
            human_95th_percentile: t,
            human_99th_percentile: t * 1.3,
            recommended_threshold: t,
        }
    }

    fn detector() -> VoiceDetector {
        let profile = BaselineProfile::from_stats([
            (FeatureKey::JITTER, FeatureStats::with_mean_std(0.04, 0.02)),
            (FeatureKey::SHIMMER, FeatureStats::with_mean_std(0.16, 0.08)),
        ]);
        VoiceDetector::new(DetectorConfig::default(), profile, thresholds(0.5)).unwrap()
    }

    #[test]
    fn too_short_is_insufficient() {
        let d = detector();
        assert!(matches!(d.analyze(&[], 16_000), Err(DetectorError::EmptySignal)));
        assert!(matches!(
            d.analyze(&vec![0.1; 4_000], 16_000),
            Err(DetectorError::InsufficientSignal(_))
        ));
    }

    #[test]
    fn low_quality_prosody_anomaly_is_uncertain() {
        let d = detector();
        let v = FeatureVector::new()
            .with(FeatureKey::JITTER, 0.001)
            .with(FeatureKey::SHIMMER, 0.01)
            .with(FeatureKey::F0_MEAN, 300.0);
        let (report, decision) = d.score_features(&v, SignalQuality::new(0.0, 0.5));
        // raw 1.9125 * reliability 0.2917 clears the 0.5 threshold
        assert!((report.reliability - 0.2917).abs() < 1e-3);
        assert!(report.final_score > 0.5);
        assert_eq!(decision.classification, Classification::Uncertain);

        let (_, clean) = d.score_features(&v, SignalQuality::new(30.0, 4.0));
        assert_eq!(clean.classification, Classification::AiGenerated);
    }

    #[test]
    fn reload_swaps_snapshot_but_not_held_ones() {
        let d = detector();
        let held = d.snapshot();
        let wide = BaselineProfile::from_stats([(FeatureKey::JITTER, FeatureStats::with_mean_std(0.04, 1.0))]);
        d.reload(wide, thresholds(2.0)).unwrap();

        assert_eq!(held.engine.threshold(), 0.5);
        assert_eq!(d.snapshot().engine.threshold(), 2.0);
        assert!(!Arc::ptr_eq(&held, &d.snapshot()));
    }

    #[test]
    fn failed_reload_keeps_previous_state() {
        let d = detector();
        let bad = CalibratedThresholds {
            human_95th_percentile: 2.0,
            human_99th_percentile: 1.0,
            recommended_threshold: 2.0,
        };
        assert!(d.reload(BaselineProfile::from_stats(std::iter::empty()), bad).is_err());
        assert_eq!(d.snapshot().engine.threshold(), 0.5);
    }
}
