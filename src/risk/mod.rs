//! Anomaly scoring against the human baseline and the final decision.

pub mod engine;
mod explain;
pub mod scorer;

pub use engine::{
    Classification, DecisionEngine, DecisionRecord, Interpretation, PublicVerdict, RiskLevel,
    SignalQualityTier, TopDeviation,
};
pub use explain::Explanation;
pub use scorer::{
    duration_factor, reliability_factor, snr_factor, AnomalyScorer, CategoryDeviations,
    DeviationReport, FeatureDeviations,
};
