//! Turns a reliability-weighted anomaly score into a classification,
//! confidence, risk level and explanation using the calibrated threshold.

use super::explain::Explanation;
use super::scorer::{CategoryDeviations, DeviationReport, FeatureDeviations};
use crate::config::DecisionConfig;
use crate::error::{DetectorError, Result};
use crate::features::Category;
use crate::profile::CalibratedThresholds;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Human,
    AiGenerated,
    Uncertain,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Human => "HUMAN",
            Classification::AiGenerated => "AI_GENERATED",
            Classification::Uncertain => "UNCERTAIN",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Low reliability is HIGH risk regardless of the score.
    pub fn from_score(final_score: f64, reliability: f64, threshold: f64, config: &DecisionConfig) -> Self {
        if reliability < config.min_reliability {
            RiskLevel::High
        } else if final_score <= threshold {
            RiskLevel::Low
        } else if final_score <= threshold * config.medium_risk_multiplier {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalQualityTier {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl SignalQualityTier {
    pub fn from_reliability(reliability: f64) -> Self {
        if reliability >= 0.9 {
            SignalQualityTier::Excellent
        } else if reliability >= 0.8 {
            SignalQualityTier::Good
        } else if reliability >= 0.7 {
            SignalQualityTier::Fair
        } else {
            SignalQualityTier::Poor
        }
    }
}

/// Where the final score falls relative to the calibrated human percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpretation {
    WithinHumanVariability,
    NearHumanLimit,
    SignificantAnomaly,
}

impl Interpretation {
    pub fn from_score(final_score: f64, thresholds: &CalibratedThresholds) -> Self {
        if final_score <= thresholds.human_95th_percentile {
            Interpretation::WithinHumanVariability
        } else if final_score <= thresholds.human_99th_percentile {
            Interpretation::NearHumanLimit
        } else {
            Interpretation::SignificantAnomaly
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopDeviation {
    pub feature: &'static str,
    /// Signed: negative means below the human mean
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub classification: Classification,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub signal_quality: SignalQualityTier,
    /// Absent when no feature could be compared with the baseline
    pub interpretation: Option<Interpretation>,
    pub anomaly_score: f64,
    pub reliability: f64,
    pub threshold: f64,
    pub explanation: Explanation,
    pub top_deviations: Vec<TopDeviation>,
}

/// Minimal wire-facing verdict: UNCERTAIN is reported as HUMAN with
/// confidence capped at 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PublicVerdict {
    pub classification: Classification,
    pub confidence: f64,
}

impl From<&DecisionRecord> for PublicVerdict {
    fn from(record: &DecisionRecord) -> Self {
        let (classification, confidence) = match record.classification {
            Classification::Uncertain => (Classification::Human, record.confidence.min(0.5)),
            c => (c, record.confidence),
        };
        Self {
            classification,
            confidence: (confidence * 1000.0).round() / 1000.0,
        }
    }
}

pub struct DecisionEngine {
    thresholds: CalibratedThresholds,
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(thresholds: CalibratedThresholds, config: DecisionConfig) -> Result<Self> {
        thresholds.validate()?;
        if !(config.min_reliability.is_finite()
            && config.agreement_sigma.is_finite()
            && config.mild_sigma.is_finite()
            && config.marker_sigma.is_finite()
            && config.medium_risk_multiplier >= 1.0)
        {
            return Err(DetectorError::Configuration(
                "decision: sigma levels must be finite and medium_risk_multiplier at least 1".into(),
            ));
        }
        Ok(Self { thresholds, config })
    }

    pub fn thresholds(&self) -> &CalibratedThresholds {
        &self.thresholds
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn threshold(&self) -> f64 {
        self.thresholds.threshold()
    }

    pub fn decide_report(&self, report: &DeviationReport) -> DecisionRecord {
        self.decide(report.final_score, report.reliability, &report.deviations)
    }

    pub fn decide(&self, final_score: f64, reliability: f64, deviations: &FeatureDeviations) -> DecisionRecord {
        let threshold = self.threshold();
        let categories = CategoryDeviations::from_deviations(deviations);
        let explanation = Explanation::build(deviations, &categories, reliability, &self.config);
        let signal_quality = SignalQualityTier::from_reliability(reliability);
        let top_deviations = deviations
            .top(self.config.top_deviations)
            .into_iter()
            .map(|(k, z)| TopDeviation { feature: k.name(), z })
            .collect();

        if deviations.is_empty() {
            return DecisionRecord {
                classification: Classification::Uncertain,
                confidence: 0.0,
                risk_level: RiskLevel::High,
                signal_quality,
                interpretation: None,
                anomaly_score: final_score,
                reliability,
                threshold,
                explanation,
                top_deviations,
            };
        }

        let classification = if final_score <= threshold {
            Classification::Human
        } else if reliability >= self.config.min_reliability {
            Classification::AiGenerated
        } else {
            Classification::Uncertain
        };

        DecisionRecord {
            classification,
            confidence: self.confidence(final_score, reliability, &categories),
            risk_level: RiskLevel::from_score(final_score, reliability, threshold, &self.config),
            signal_quality,
            interpretation: Some(Interpretation::from_score(final_score, &self.thresholds)),
            anomaly_score: final_score,
            reliability,
            threshold,
            explanation,
            top_deviations,
        }
    }

    /// 0.5 distance from threshold + 0.3 reliability + 0.2 category agreement.
    fn confidence(&self, final_score: f64, reliability: f64, categories: &CategoryDeviations) -> f64 {
        let t = self.threshold();
        let distance = if final_score <= t {
            1.0 - final_score / t
        } else {
            ((final_score - t) / t).min(1.0)
        };
        let agreeing = Category::CORROBORATING
            .iter()
            .filter(|c| categories.get(**c) > self.config.agreement_sigma)
            .count();
        let agreement = agreeing as f64 / Category::CORROBORATING.len() as f64;
        (0.5 * distance + 0.3 * reliability + 0.2 * agreement).clamp(0.0, 1.0)
    }
}
