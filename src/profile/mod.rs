//! Human baseline profile: per-feature descriptive statistics learned offline
//! from verified-human recordings, loaded once and read-only afterwards.

pub mod stats;
mod thresholds;

pub use thresholds::CalibratedThresholds;

use crate::error::{DetectorError, Result};
use crate::features::{layout_hash, FeatureKey, FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Statistics of one feature over the reference corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub mean: f64,
    /// Sample standard deviation; zero disables the feature in scoring.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

impl FeatureStats {
    /// Stats with only location and scale known; range and quartiles collapse to the mean.
    pub fn with_mean_std(mean: f64, std: f64) -> Self {
        Self {
            mean,
            std,
            min: mean,
            max: mean,
            q1: mean,
            q3: mean,
        }
    }

    /// Signed z-score, or `None` when the feature cannot be normalised.
    pub fn z_score(&self, value: f64) -> Option<f64> {
        if self.std > 0.0 && value.is_finite() {
            Some((value - self.mean) / self.std)
        } else {
            None
        }
    }

    fn from_samples(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            mean: stats::mean(values),
            std: stats::sample_std(values),
            min: sorted.first().copied().unwrap_or(0.0),
            max: sorted.last().copied().unwrap_or(0.0),
            q1: stats::quantile_sorted(&sorted, 0.25),
            q3: stats::quantile_sorted(&sorted, 0.75),
        }
    }
}

/// Fixed-schema profile: one [`FeatureStats`] slot per [`FeatureKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineProfile {
    stats: [FeatureStats; FEATURE_COUNT],
    sample_count: usize,
}

impl BaselineProfile {
    /// Learn the profile from a human-only corpus. Keys never observed keep zero stats.
    pub fn build(corpus: &[FeatureVector]) -> Result<Self> {
        if corpus.is_empty() {
            return Err(DetectorError::Calibration("empty feature corpus".into()));
        }
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); FEATURE_COUNT];
        for v in corpus {
            for (key, value) in v.iter() {
                if value.is_finite() {
                    columns[key.index()].push(value);
                }
            }
        }

        let mut profile = Self {
            stats: [FeatureStats::default(); FEATURE_COUNT],
            sample_count: corpus.len(),
        };
        for (slot, column) in profile.stats.iter_mut().zip(&columns) {
            if !column.is_empty() {
                *slot = FeatureStats::from_samples(column);
            }
        }
        tracing::info!(
            samples = corpus.len(),
            disabled = profile.stats.iter().filter(|s| s.std <= 0.0).count(),
            "baseline profile built"
        );
        Ok(profile)
    }

    /// Profile from explicit entries; every other key is disabled.
    pub fn from_stats(entries: impl IntoIterator<Item = (FeatureKey, FeatureStats)>) -> Self {
        let mut stats = [FeatureStats::default(); FEATURE_COUNT];
        for (key, s) in entries {
            stats[key.index()] = s;
        }
        Self {
            stats,
            sample_count: 0,
        }
    }

    pub fn stats(&self, key: FeatureKey) -> &FeatureStats {
        &self.stats[key.index()]
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Keys with a usable (positive) standard deviation.
    pub fn active_keys(&self) -> impl Iterator<Item = FeatureKey> + '_ {
        FeatureKey::all().filter(move |k| self.stats(*k).std > 0.0)
    }

    /// Vector holding the baseline mean of every key.
    pub fn mean_vector(&self) -> FeatureVector {
        FeatureKey::all().fold(FeatureVector::new(), |v, k| v.with(k, self.stats(k).mean))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let file: ProfileFile = serde_json::from_str(data)
            .map_err(|e| DetectorError::Configuration(format!("malformed baseline profile: {}", e)))?;
        file.into_profile()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&ProfileFile::from_profile(self))?)
    }

    /// Read and validate; the file is closed before parsing begins.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            DetectorError::Configuration(format!("baseline profile {}: {}", path.display(), e))
        })?;
        let profile = Self::from_json(&data)?;
        tracing::info!(
            path = %path.display(),
            samples = profile.sample_count,
            active = profile.active_keys().count(),
            digest = %profile.digest(),
            "baseline profile loaded"
        );
        Ok(profile)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Hex SHA-256 of the canonical serialized form.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_vec(&ProfileFile::from_profile(self)).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }
}

/// On-disk layout: parallel maps from feature name to statistic.
#[derive(Serialize, Deserialize)]
struct ProfileFile {
    mean: BTreeMap<String, f64>,
    std: BTreeMap<String, f64>,
    #[serde(default)]
    min: BTreeMap<String, f64>,
    #[serde(default)]
    max: BTreeMap<String, f64>,
    #[serde(default)]
    q1: BTreeMap<String, f64>,
    #[serde(default)]
    q3: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sample_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    layout_hash: Option<String>,
}

impl ProfileFile {
    fn from_profile(p: &BaselineProfile) -> Self {
        let column = |f: fn(&FeatureStats) -> f64| -> BTreeMap<String, f64> {
            FeatureKey::all()
                .map(|k| (k.name().to_string(), f(p.stats(k))))
                .collect()
        };
        Self {
            mean: column(|s| s.mean),
            std: column(|s| s.std),
            min: column(|s| s.min),
            max: column(|s| s.max),
            q1: column(|s| s.q1),
            q3: column(|s| s.q3),
            sample_count: Some(p.sample_count),
            layout_hash: Some(layout_hash()),
        }
    }

    fn into_profile(self) -> Result<BaselineProfile> {
        if let Some(hash) = &self.layout_hash {
            if *hash != layout_hash() {
                return Err(DetectorError::Configuration(
                    "baseline profile was built for a different feature layout".into(),
                ));
            }
        }

        for (field, map) in [
            ("mean", &self.mean),
            ("std", &self.std),
            ("min", &self.min),
            ("max", &self.max),
            ("q1", &self.q1),
            ("q3", &self.q3),
        ] {
            for (name, value) in map {
                if FeatureKey::from_name(name).is_none() {
                    return Err(DetectorError::Configuration(format!(
                        "baseline profile `{}` has unknown feature `{}`",
                        field, name
                    )));
                }
                if !value.is_finite() {
                    return Err(DetectorError::Configuration(format!(
                        "baseline profile `{}.{}` is not finite",
                        field, name
                    )));
                }
            }
        }

        let mut stats = [FeatureStats::default(); FEATURE_COUNT];
        for key in FeatureKey::all() {
            let name = key.name();
            let (Some(&mean), Some(&std)) = (self.mean.get(name), self.std.get(name)) else {
                return Err(DetectorError::Configuration(format!(
                    "baseline profile is missing mean/std for `{}`",
                    name
                )));
            };
            if std < 0.0 {
                return Err(DetectorError::Configuration(format!(
                    "baseline profile has negative std for `{}`",
                    name
                )));
            }
            let or_mean = |m: &BTreeMap<String, f64>| m.get(name).copied().unwrap_or(mean);
            stats[key.index()] = FeatureStats {
                mean,
                std,
                min: or_mean(&self.min),
                max: or_mean(&self.max),
                q1: or_mean(&self.q1),
                q3: or_mean(&self.q3),
            };
        }

        Ok(BaselineProfile {
            stats,
            sample_count: self.sample_count.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn corpus() -> Vec<FeatureVector> {
        [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .map(|&x| {
                FeatureVector::new()
                    .with(FeatureKey::JITTER, x)
                    .with(FeatureKey::F0_MEAN, 200.0)
            })
            .collect()
    }

    #[test]
    fn build_computes_descriptive_stats() {
        let p = BaselineProfile::build(&corpus()).unwrap();
        let j = p.stats(FeatureKey::JITTER);
        assert_eq!(j.mean, 3.0);
        assert!((j.std - 2.5f64.sqrt()).abs() < 1e-12);
        assert_eq!((j.min, j.max, j.q1, j.q3), (1.0, 5.0, 2.0, 4.0));

        // Constant feature is present but disabled.
        assert_eq!(p.stats(FeatureKey::F0_MEAN).std, 0.0);
        // Never observed.
        assert_eq!(*p.stats(FeatureKey::SHIMMER), FeatureStats::default());
        assert_eq!(p.active_keys().collect::<Vec<_>>(), vec![FeatureKey::JITTER]);
        assert_eq!(p.sample_count(), 5);
    }

    #[test]
    fn empty_corpus_is_rejected() {
        assert!(matches!(BaselineProfile::build(&[]), Err(DetectorError::Calibration(_))));
    }

    #[test]
    fn json_round_trip_preserves_every_key() {
        let p = BaselineProfile::build(&corpus()).unwrap();
        let back = BaselineProfile::from_json(&p.to_json().unwrap()).unwrap();
        assert_eq!(back.sample_count(), 5);
        for key in FeatureKey::all() {
            let (a, b) = (p.stats(key), back.stats(key));
            assert!((a.mean - b.mean).abs() < 1e-12 && (a.std - b.std).abs() < 1e-12, "{key}");
            assert!((a.q1 - b.q1).abs() < 1e-12 && (a.q3 - b.q3).abs() < 1e-12, "{key}");
        }
    }

    fn full_maps(std: f64) -> (BTreeMap<String, f64>, BTreeMap<String, f64>) {
        let mean = FeatureKey::all().map(|k| (k.name().to_string(), 1.0)).collect();
        let stds = FeatureKey::all().map(|k| (k.name().to_string(), std)).collect();
        (mean, stds)
    }

    #[test]
    fn minimal_file_defaults_range_to_mean() {
        let (mean, std) = full_maps(0.5);
        let p = BaselineProfile::from_json(&json!({ "mean": mean, "std": std }).to_string()).unwrap();
        let s = p.stats(FeatureKey::ZCR_MEAN);
        assert_eq!((s.mean, s.std, s.min, s.q3), (1.0, 0.5, 1.0, 1.0));
    }

    #[test]
    fn unknown_missing_and_invalid_entries_are_configuration_errors() {
        let (mut mean, std) = full_maps(0.5);
        mean.insert("tempo".into(), 1.0);
        let unknown = json!({ "mean": mean, "std": std }).to_string();
        assert!(matches!(BaselineProfile::from_json(&unknown), Err(DetectorError::Configuration(_))));

        let (mean, mut std) = full_maps(0.5);
        std.remove("jitter");
        let missing = json!({ "mean": mean, "std": std }).to_string();
        assert!(matches!(BaselineProfile::from_json(&missing), Err(DetectorError::Configuration(_))));

        let (mean, mut std) = full_maps(0.5);
        std.insert("shimmer".into(), -1.0);
        let negative = json!({ "mean": mean, "std": std }).to_string();
        assert!(matches!(BaselineProfile::from_json(&negative), Err(DetectorError::Configuration(_))));

        let (mean, std) = full_maps(0.5);
        let foreign = json!({ "mean": mean, "std": std, "layout_hash": "abc" }).to_string();
        assert!(matches!(BaselineProfile::from_json(&foreign), Err(DetectorError::Configuration(_))));

        assert!(matches!(BaselineProfile::from_json("{"), Err(DetectorError::Configuration(_))));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = BaselineProfile::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, DetectorError::Configuration(_)));
    }
}
