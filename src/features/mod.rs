//! Acoustic feature extraction: waveform → fixed, named set of spectral,
//! prosodic and temporal measurements.

mod frames;
mod layout;
mod pipeline;
mod prosodic;
mod quality;
mod spectral;
mod temporal;

pub use layout::{layout_hash, Category, FeatureKey, FeatureSpec, FEATURE_COUNT, FEATURE_LAYOUT, MFCC_COUNT};
pub use pipeline::FeatureExtractor;
pub use quality::SignalQuality;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feature values indexed by [`FeatureKey`].
///
/// The extractor always fills every key. Vectors coming from outside (corpus
/// files, callers with their own front end) may be partial; unknown names are
/// rejected when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, f64>", try_from = "BTreeMap<String, f64>")]
pub struct FeatureVector {
    values: [Option<f64>; FEATURE_COUNT],
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureVector {
    pub fn new() -> Self {
        Self {
            values: [None; FEATURE_COUNT],
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: FeatureKey, value: f64) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: FeatureKey, value: f64) {
        self.values[key.index()] = Some(value);
    }

    pub fn get(&self, key: FeatureKey) -> Option<f64> {
        self.values[key.index()]
    }

    /// Present entries in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureKey, f64)> + '_ {
        FeatureKey::all().filter_map(move |k| self.get(k).map(|v| (k, v)))
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.is_none())
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_some())
    }
}

impl From<FeatureVector> for BTreeMap<String, f64> {
    fn from(v: FeatureVector) -> Self {
        v.iter().map(|(k, x)| (k.name().to_string(), x)).collect()
    }
}

impl TryFrom<BTreeMap<String, f64>> for FeatureVector {
    type Error = String;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut out = FeatureVector::new();
        for (name, value) in map {
            let key = FeatureKey::from_name(&name)
                .ok_or_else(|| format!("unknown feature key `{}`", name))?;
            out.set(key, value);
        }
        Ok(out)
    }
}
