//! Scoring + decision benchmark: the per-request cost once features exist.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use voxguard::config::DecisionConfig;
use voxguard::features::{FeatureKey, FeatureVector};
use voxguard::profile::{BaselineProfile, CalibratedThresholds, FeatureStats};
use voxguard::risk::{AnomalyScorer, DecisionEngine};

fn profile() -> BaselineProfile {
    BaselineProfile::from_stats(
        FeatureKey::all().map(|k| (k, FeatureStats::with_mean_std(k.index() as f64, 1.0 + k.index() as f64 / 10.0))),
    )
}

fn sample() -> FeatureVector {
    FeatureKey::all().fold(FeatureVector::new(), |v, k| {
        v.with(k, k.index() as f64 + if k.index() % 3 == 0 { 2.5 } else { -0.4 })
    })
}

fn bench_score_and_decide(c: &mut Criterion) {
    let scorer = AnomalyScorer::new(Arc::new(profile()));
    let thresholds = CalibratedThresholds {
        human_95th_percentile: 1.1,
        human_99th_percentile: 1.5,
        recommended_threshold: 1.1,
    };
    let engine = DecisionEngine::new(thresholds, DecisionConfig::default()).expect("valid thresholds");
    let v = sample();

    c.bench_function("score_38_features", |b| {
        b.iter(|| black_box(scorer.score(black_box(&v), 18.0, 2.4)))
    });
    c.bench_function("score_and_decide", |b| {
        b.iter(|| {
            let report = scorer.score(black_box(&v), 18.0, 2.4);
            black_box(engine.decide_report(&report))
        })
    });
}

criterion_group!(benches, bench_score_and_decide);
criterion_main!(benches);
