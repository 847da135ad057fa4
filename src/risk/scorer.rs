//! Reliability-weighted anomaly scoring against the human baseline.

use crate::features::{Category, FeatureKey, FeatureVector, FEATURE_COUNT};
use crate::profile::BaselineProfile;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// Quality factors never discount a signal below this.
const FACTOR_FLOOR: f64 = 0.5;
/// SNR (dB) at which the SNR factor saturates.
const FULL_SNR_DB: f64 = 20.0;
/// Duration (s) at which the duration factor saturates.
const FULL_DURATION_SECS: f64 = 3.0;

fn ramp(x: f64, full: f64) -> f64 {
    if x.is_nan() {
        return FACTOR_FLOOR;
    }
    (FACTOR_FLOOR + FACTOR_FLOOR * x / full).clamp(FACTOR_FLOOR, 1.0)
}

/// 0.5 at 0 dB rising linearly to 1.0 at 20 dB and above.
pub fn snr_factor(snr_db: f64) -> f64 {
    ramp(snr_db, FULL_SNR_DB)
}

/// 0.5 at 0 s rising linearly to 1.0 at 3 s and above.
pub fn duration_factor(duration_secs: f64) -> f64 {
    ramp(duration_secs, FULL_DURATION_SECS)
}

/// Product of the SNR and duration factors; always within [0.25, 1.0].
pub fn reliability_factor(snr_db: f64, duration_secs: f64) -> f64 {
    snr_factor(snr_db) * duration_factor(duration_secs)
}

/// Signed z-scores for every feature that could be normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDeviations {
    z: [Option<f64>; FEATURE_COUNT],
}

impl Default for FeatureDeviations {
    fn default() -> Self {
        Self {
            z: [None; FEATURE_COUNT],
        }
    }
}

impl FeatureDeviations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: FeatureKey, z: f64) -> Self {
        self.z[key.index()] = Some(z);
        self
    }

    pub fn z_score(&self, key: FeatureKey) -> Option<f64> {
        self.z[key.index()]
    }

    /// |z| for `key`, if it was scored.
    pub fn deviation(&self, key: FeatureKey) -> Option<f64> {
        self.z_score(key).map(f64::abs)
    }

    /// (key, signed z) in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureKey, f64)> + '_ {
        FeatureKey::all().filter_map(move |k| self.z_score(k).map(|z| (k, z)))
    }

    pub fn len(&self) -> usize {
        self.z.iter().filter(|z| z.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.z.iter().all(|z| z.is_none())
    }

    /// Mean |z| over every scored feature.
    pub fn pooled_mean(&self) -> f64 {
        let n = self.len();
        if n == 0 {
            return 0.0;
        }
        self.iter().map(|(_, z)| z.abs()).sum::<f64>() / n as f64
    }

    /// Strongest `n` deviations by |z|, ties broken by layout order.
    pub fn top(&self, n: usize) -> Vec<(FeatureKey, f64)> {
        let mut all: Vec<(FeatureKey, f64)> = self.iter().collect();
        all.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        all.truncate(n);
        all
    }
}

impl Serialize for FeatureDeviations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(k, z)| (k.name(), z.abs())))
    }
}

/// Mean |z| per category; zero for a category with no scored feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryDeviations {
    pub spectral: f64,
    pub prosodic: f64,
    pub temporal: f64,
    pub other: f64,
}

impl CategoryDeviations {
    pub fn from_deviations(d: &FeatureDeviations) -> Self {
        let mut sums = [0.0f64; 4];
        let mut counts = [0usize; 4];
        for (key, z) in d.iter() {
            let i = key.category().index();
            sums[i] += z.abs();
            counts[i] += 1;
        }
        let avg = |i: usize| if counts[i] == 0 { 0.0 } else { sums[i] / counts[i] as f64 };
        Self {
            spectral: avg(0),
            prosodic: avg(1),
            temporal: avg(2),
            other: avg(3),
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Spectral => self.spectral,
            Category::Prosodic => self.prosodic,
            Category::Temporal => self.temporal,
            Category::Other => self.other,
        }
    }
}

/// Per-request deviation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationReport {
    pub deviations: FeatureDeviations,
    pub categories: CategoryDeviations,
    /// Pooled mean |z|: the forensic deviation index before quality weighting
    pub raw_score: f64,
    pub reliability: f64,
    /// raw_score * reliability
    pub final_score: f64,
}

impl DeviationReport {
    /// No feature overlapped the profile, so nothing was evaluated.
    pub fn is_degenerate(&self) -> bool {
        self.deviations.is_empty()
    }
}

/// Scores feature vectors against one immutable baseline profile.
#[derive(Debug, Clone)]
pub struct AnomalyScorer {
    profile: Arc<BaselineProfile>,
}

impl AnomalyScorer {
    pub fn new(profile: Arc<BaselineProfile>) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &BaselineProfile {
        &self.profile
    }

    /// Signed z-scores for keys present in both the vector and the profile.
    pub fn deviations(&self, features: &FeatureVector) -> FeatureDeviations {
        let mut out = FeatureDeviations::new();
        for (key, value) in features.iter() {
            if let Some(z) = self.profile.stats(key).z_score(value) {
                out.z[key.index()] = Some(z);
            }
        }
        out
    }

    pub fn score(&self, features: &FeatureVector, snr_db: f64, duration_secs: f64) -> DeviationReport {
        let deviations = self.deviations(features);
        if deviations.is_empty() {
            tracing::warn!(
                present = features.len(),
                "no feature overlaps the baseline profile; sample cannot be evaluated"
            );
            return DeviationReport {
                deviations,
                categories: CategoryDeviations::default(),
                raw_score: 0.0,
                reliability: 0.0,
                final_score: 0.0,
            };
        }

        let categories = CategoryDeviations::from_deviations(&deviations);
        let raw_score = deviations.pooled_mean();
        let reliability = reliability_factor(snr_db, duration_secs);
        DeviationReport {
            deviations,
            categories,
            raw_score,
            reliability,
            final_score: raw_score * reliability,
        }
    }
}
