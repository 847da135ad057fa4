//! Human-readable explanation of a decision, keyed by feature category.

use super::scorer::{CategoryDeviations, FeatureDeviations};
use crate::config::DecisionConfig;
use crate::features::{Category, FeatureKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub spectral: String,
    pub prosodic: String,
    pub temporal: String,
    pub decision_note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_warning: Option<String>,
}

impl Explanation {
    pub fn build(
        deviations: &FeatureDeviations,
        categories: &CategoryDeviations,
        reliability: f64,
        config: &DecisionConfig,
    ) -> Self {
        let quality_warning = (reliability < config.min_reliability).then(|| {
            format!(
                "Low signal quality (reliability: {:.2}) - decision confidence reduced",
                reliability
            )
        });

        if deviations.is_empty() {
            let none = "No features available for comparison with the human baseline".to_string();
            return Self {
                spectral: none.clone(),
                prosodic: none.clone(),
                temporal: none,
                decision_note: "Sample could not be evaluated against the human baseline".into(),
                quality_warning,
            };
        }

        let deviating = Category::CORROBORATING
            .iter()
            .filter(|c| categories.get(**c) > config.agreement_sigma)
            .count();
        let decision_note = match deviating {
            0 => "All feature categories within expected human range",
            1 => "Single category deviation detected",
            _ => "Multiple independent feature categories show significant deviations",
        }
        .to_string();

        Self {
            spectral: describe(
                Category::Spectral,
                categories.spectral,
                config,
                Some("MFCC patterns show artificial smoothness"),
            ),
            prosodic: prosodic_note(deviations, categories.prosodic, config),
            temporal: describe(
                Category::Temporal,
                categories.temporal,
                config,
                Some("unnatural rhythm"),
            ),
            decision_note,
            quality_warning,
        }
    }
}

fn title(category: Category) -> &'static str {
    match category {
        Category::Spectral => "Spectral",
        Category::Prosodic => "Prosodic",
        Category::Temporal => "Temporal",
        Category::Other => "Other",
    }
}

fn describe(
    category: Category,
    sigma: f64,
    config: &DecisionConfig,
    detail: Option<&'static str>,
) -> String {
    let name = title(category);
    if sigma > config.agreement_sigma {
        match detail {
            Some(d) => format!("{} features deviate {:.2}σ from human baseline ({})", name, sigma, d),
            None => format!("{} features deviate {:.2}σ from human baseline", name, sigma),
        }
    } else if sigma > config.mild_sigma {
        format!("Mild {} deviation detected ({:.2}σ)", category.as_str(), sigma)
    } else {
        format!("{} features within human range", name)
    }
}

/// Significant prosodic deviation is pinned on jitter, then shimmer, when
/// either clears the marker level on its own.
fn prosodic_note(deviations: &FeatureDeviations, sigma: f64, config: &DecisionConfig) -> String {
    if sigma > config.agreement_sigma {
        let markers = [
            (FeatureKey::JITTER, "Pitch jitter"),
            (FeatureKey::SHIMMER, "Amplitude shimmer"),
        ];
        for (key, label) in markers {
            if let Some(z) = deviations.z_score(key) {
                if z.abs() > config.marker_sigma {
                    let side = if z < 0.0 { "below" } else { "above" };
                    return format!(
                        "{} {} biological human range ({:.2}σ deviation)",
                        label, side, sigma
                    );
                }
            }
        }
    }
    describe(Category::Prosodic, sigma, config, None)
}
