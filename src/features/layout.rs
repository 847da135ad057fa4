//! Feature layout: the fixed key set, its order, and the category of every key.
//!
//! The layout is the single source of truth for feature names. Profiles carry
//! [`layout_hash`] so a profile built against a different key set is refused
//! at load time instead of being scored against the wrong features.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Number of cepstral coefficients summarised per recording
pub const MFCC_COUNT: usize = 13;

/// Total number of features
pub const FEATURE_COUNT: usize = 38;

/// Feature category used for per-category deviation and explanations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Spectral,
    Prosodic,
    Temporal,
    Other,
}

impl Category {
    /// Categories that vote in the cross-category agreement factor.
    pub const CORROBORATING: [Category; 3] =
        [Category::Spectral, Category::Prosodic, Category::Temporal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Spectral => "spectral",
            Category::Prosodic => "prosodic",
            Category::Temporal => "temporal",
            Category::Other => "other",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Category::Spectral => 0,
            Category::Prosodic => 1,
            Category::Temporal => 2,
            Category::Other => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct FeatureSpec {
    pub name: &'static str,
    pub category: Category,
}

const fn spec(name: &'static str, category: Category) -> FeatureSpec {
    FeatureSpec { name, category }
}

/// Feature names in exact vector order, tagged with their category.
pub const FEATURE_LAYOUT: [FeatureSpec; FEATURE_COUNT] = [
    // === Cepstral means (0-12) ===
    spec("mfcc_mean_0", Category::Spectral),
    spec("mfcc_mean_1", Category::Spectral),
    spec("mfcc_mean_2", Category::Spectral),
    spec("mfcc_mean_3", Category::Spectral),
    spec("mfcc_mean_4", Category::Spectral),
    spec("mfcc_mean_5", Category::Spectral),
    spec("mfcc_mean_6", Category::Spectral),
    spec("mfcc_mean_7", Category::Spectral),
    spec("mfcc_mean_8", Category::Spectral),
    spec("mfcc_mean_9", Category::Spectral),
    spec("mfcc_mean_10", Category::Spectral),
    spec("mfcc_mean_11", Category::Spectral),
    spec("mfcc_mean_12", Category::Spectral),
    // === Cepstral spread (13-25) ===
    spec("mfcc_std_0", Category::Spectral),
    spec("mfcc_std_1", Category::Spectral),
    spec("mfcc_std_2", Category::Spectral),
    spec("mfcc_std_3", Category::Spectral),
    spec("mfcc_std_4", Category::Spectral),
    spec("mfcc_std_5", Category::Spectral),
    spec("mfcc_std_6", Category::Spectral),
    spec("mfcc_std_7", Category::Spectral),
    spec("mfcc_std_8", Category::Spectral),
    spec("mfcc_std_9", Category::Spectral),
    spec("mfcc_std_10", Category::Spectral),
    spec("mfcc_std_11", Category::Spectral),
    spec("mfcc_std_12", Category::Spectral),
    // === Spectral shape (26-31) ===
    spec("centroid_mean", Category::Spectral),
    spec("bandwidth_mean", Category::Spectral),
    spec("flatness_mean", Category::Spectral),
    spec("rolloff_mean", Category::Spectral),
    spec("contrast_mean", Category::Spectral),
    spec("flux_mean", Category::Spectral),
    // === Prosody (32-35) ===
    spec("f0_mean", Category::Prosodic),
    spec("f0_std", Category::Prosodic),
    spec("jitter", Category::Prosodic),
    spec("shimmer", Category::Prosodic),
    // === Temporal (36-37) ===
    spec("zcr_mean", Category::Temporal),
    spec("energy_entropy", Category::Temporal),
];

/// Index into [`FEATURE_LAYOUT`]. Only constructible for valid positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureKey(u8);

impl FeatureKey {
    pub const CENTROID_MEAN: FeatureKey = FeatureKey(26);
    pub const BANDWIDTH_MEAN: FeatureKey = FeatureKey(27);
    pub const FLATNESS_MEAN: FeatureKey = FeatureKey(28);
    pub const ROLLOFF_MEAN: FeatureKey = FeatureKey(29);
    pub const CONTRAST_MEAN: FeatureKey = FeatureKey(30);
    pub const FLUX_MEAN: FeatureKey = FeatureKey(31);
    pub const F0_MEAN: FeatureKey = FeatureKey(32);
    pub const F0_STD: FeatureKey = FeatureKey(33);
    pub const JITTER: FeatureKey = FeatureKey(34);
    pub const SHIMMER: FeatureKey = FeatureKey(35);
    pub const ZCR_MEAN: FeatureKey = FeatureKey(36);
    pub const ENERGY_ENTROPY: FeatureKey = FeatureKey(37);

    /// Mean of cepstral coefficient `i`. Panics if `i >= MFCC_COUNT`.
    pub const fn mfcc_mean(i: usize) -> FeatureKey {
        assert!(i < MFCC_COUNT);
        FeatureKey(i as u8)
    }

    /// Standard deviation of cepstral coefficient `i`. Panics if `i >= MFCC_COUNT`.
    pub const fn mfcc_std(i: usize) -> FeatureKey {
        assert!(i < MFCC_COUNT);
        FeatureKey((MFCC_COUNT + i) as u8)
    }

    /// Lookup by name through an index built once per process.
    pub fn from_name(name: &str) -> Option<FeatureKey> {
        static INDEX: OnceLock<HashMap<&'static str, FeatureKey>> = OnceLock::new();
        INDEX
            .get_or_init(|| {
                FEATURE_LAYOUT
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (s.name, FeatureKey(i as u8)))
                    .collect()
            })
            .get(name)
            .copied()
    }

    pub fn all() -> impl Iterator<Item = FeatureKey> {
        (0..FEATURE_COUNT).map(|i| FeatureKey(i as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        FEATURE_LAYOUT[self.index()].name
    }

    pub fn category(self) -> Category {
        FEATURE_LAYOUT[self.index()].category
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hex SHA-256 over the ordered feature names.
pub fn layout_hash() -> String {
    let mut hasher = Sha256::new();
    for s in FEATURE_LAYOUT.iter() {
        hasher.update(s.name.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_resolvable() {
        for key in FeatureKey::all() {
            assert_eq!(FeatureKey::from_name(key.name()), Some(key));
        }
        assert_eq!(FeatureKey::from_name("mfcc_mean_13"), None);
    }

    #[test]
    fn category_partition_sizes() {
        let count = |c: Category| FeatureKey::all().filter(|k| k.category() == c).count();
        assert_eq!(count(Category::Spectral), 2 * MFCC_COUNT + 6);
        assert_eq!(count(Category::Prosodic), 4);
        assert_eq!(count(Category::Temporal), 2);
        assert_eq!(count(Category::Other), 0);
    }

    #[test]
    fn named_constants_match_layout() {
        assert_eq!(FeatureKey::JITTER.name(), "jitter");
        assert_eq!(FeatureKey::SHIMMER.name(), "shimmer");
        assert_eq!(FeatureKey::ENERGY_ENTROPY.name(), "energy_entropy");
        assert_eq!(FeatureKey::mfcc_std(12).name(), "mfcc_std_12");
        assert_eq!(FeatureKey::FLUX_MEAN.category(), Category::Spectral);
    }

    #[test]
    fn layout_hash_is_stable() {
        assert_eq!(layout_hash(), layout_hash());
        assert_eq!(layout_hash().len(), 64);
    }
}
