//! Integration test: config load, profile and threshold files on disk, full
//! analysis of synthetic recordings, concurrent use and hot reload.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;
use voxguard::{
    config::DetectorConfig,
    features::{FeatureExtractor, FeatureKey, FeatureVector},
    profile::{BaselineProfile, CalibratedThresholds},
    risk::{AnomalyScorer, Classification, RiskLevel},
    DetectorError, VoiceDetector,
};

const SR: u32 = 16_000;

/// Harmonic tone with vibrato, per-sample pitch wobble, amplitude envelope and noise.
fn synthetic_voice(rng: &mut StdRng, secs: f32) -> Vec<f32> {
    let sr = SR as f32;
    let tau = 2.0 * std::f32::consts::PI;
    let base = rng.gen_range(100.0f32..220.0);
    let vib_rate = rng.gen_range(3.0f32..7.0);
    let vib_depth = rng.gen_range(2.0f32..10.0);
    let h2 = rng.gen_range(0.1f32..0.4);
    let noise = rng.gen_range(0.005f32..0.03);
    let mut phase = 0.0f32;
    (0..(sr * secs) as usize)
        .map(|i| {
            let t = i as f32 / sr;
            let f0 = base + vib_depth * (tau * vib_rate * t).sin() + rng.gen_range(-1.5f32..1.5);
            phase += tau * f0 / sr;
            let env = 0.6 + 0.4 * (tau * 2.0 * t).sin().abs();
            env * (0.4 * phase.sin() + h2 * (2.0 * phase).sin()) + noise * rng.gen_range(-1.0f32..1.0)
        })
        .collect()
}

fn pure_tone(freq: f32, secs: f32) -> Vec<f32> {
    let sr = SR as f32;
    (0..(sr * secs) as usize)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin())
        .collect()
}

struct Fixture {
    _dir: tempfile::TempDir,
    config: DetectorConfig,
    corpus_scores: Vec<f64>,
}

/// Profile from one synthetic corpus, thresholds from a held-out one, both written to disk.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DetectorConfig::default();
    config.profile_path = dir.path().join("profile.json");
    config.thresholds_path = dir.path().join("thresholds.json");

    let extractor = FeatureExtractor::new(config.features.clone()).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let corpus: Vec<FeatureVector> = (0..12)
        .map(|_| extractor.extract(&synthetic_voice(&mut rng, 1.0), SR).unwrap())
        .collect();
    let profile = BaselineProfile::build(&corpus).unwrap();
    profile.save(&config.profile_path).unwrap();

    let scorer = AnomalyScorer::new(Arc::new(profile));
    let corpus_scores: Vec<f64> = corpus
        .iter()
        .map(|v| scorer.score(v, 30.0, 3.0).raw_score)
        .collect();

    let held_out: Vec<f64> = (0..8)
        .map(|_| {
            let s = synthetic_voice(&mut rng, 1.0);
            let (v, q) = extractor.extract_with_quality(&s, SR).unwrap();
            scorer.score(&v, q.snr_db, q.duration_secs).final_score
        })
        .collect();
    CalibratedThresholds::calibrate(&held_out)
        .unwrap()
        .save(&config.thresholds_path)
        .unwrap();

    Fixture {
        _dir: dir,
        config,
        corpus_scores,
    }
}

#[test]
fn config_load_default() {
    let c = DetectorConfig::load(Path::new("nonexistent.json")).unwrap();
    assert_eq!(c.features.sample_rate, 16_000);
    assert_eq!(c.features.frame_length, 2048);
    assert_eq!(c.decision.min_reliability, 0.7);
    assert_eq!(c.limits.min_duration_secs, 0.3);
}

#[test]
fn config_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voxguard.json");
    std::fs::write(&path, r#"{"decision": {"min_reliability": 0.8}, "log": {"json": false}}"#).unwrap();
    let c = DetectorConfig::load(&path).unwrap();
    assert_eq!(c.decision.min_reliability, 0.8);
    assert_eq!(c.decision.agreement_sigma, 1.5);
    assert!(!c.log.json);
    assert_eq!(c.features.hop_length, 512);
}

#[test]
fn malformed_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voxguard.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(
        DetectorConfig::load(&path),
        Err(DetectorError::Configuration(_))
    ));

    // A directory at the config path exists but cannot be read as a file.
    assert!(matches!(
        DetectorConfig::load(dir.path()),
        Err(DetectorError::Configuration(_))
    ));
}

#[test]
fn missing_profile_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DetectorConfig::default();
    config.profile_path = dir.path().join("absent.json");
    config.thresholds_path = dir.path().join("absent_too.json");
    assert!(matches!(
        VoiceDetector::from_config(config),
        Err(DetectorError::Configuration(_))
    ));
}

#[test]
fn profile_file_round_trip() {
    let f = fixture();
    let loaded = BaselineProfile::load(&f.config.profile_path).unwrap();
    assert_eq!(loaded.sample_count(), 12);
    assert!(loaded.active_keys().count() > 30);
    let again = BaselineProfile::from_json(&loaded.to_json().unwrap()).unwrap();
    assert_eq!(again.sample_count(), loaded.sample_count());
    assert_eq!(again.active_keys().count(), loaded.active_keys().count());

    let t = CalibratedThresholds::load(&f.config.thresholds_path).unwrap();
    assert!(t.human_95th_percentile <= t.human_99th_percentile);
    assert_eq!(t.threshold(), t.human_95th_percentile);
}

#[test]
fn corpus_members_sit_near_the_baseline() {
    let f = fixture();
    let mean = f.corpus_scores.iter().sum::<f64>() / f.corpus_scores.len() as f64;
    assert!(mean > 0.3 && mean < 1.2, "corpus mean |z| = {mean}");
}

#[test]
fn end_to_end_analysis() {
    let f = fixture();
    let detector = VoiceDetector::from_config(f.config.clone()).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let samples = synthetic_voice(&mut rng, 1.5);

    let a = detector.analyze(&samples, SR).unwrap();
    assert!(a.features.is_complete());
    assert!((a.quality.duration_secs - 1.5).abs() < 1e-9);
    assert!((0.25..=1.0).contains(&a.deviation.reliability));
    assert!(a.decision.top_deviations.len() <= 5);
    assert!((0.0..=1.0).contains(&a.decision.confidence));
    assert_eq!(a.decision.threshold, detector.snapshot().engine.threshold());

    let b = detector.analyze(&samples, SR).unwrap();
    assert_eq!(a.features, b.features);
    assert_eq!(a.decision.anomaly_score.to_bits(), b.decision.anomaly_score.to_bits());
    assert_ne!(a.id, b.id);

    let json = serde_json::to_value(&a).unwrap();
    assert!(json["features"]["jitter"].is_number());
    assert!(json["decision"]["classification"].is_string());
}

#[test]
fn steady_tone_deviates_more_than_corpus() {
    let f = fixture();
    let detector = VoiceDetector::from_config(f.config.clone()).unwrap();
    let corpus_mean = f.corpus_scores.iter().sum::<f64>() / f.corpus_scores.len() as f64;

    // Three seconds of noiseless audio: full reliability, so the score is not discounted.
    let a = detector.analyze(&pure_tone(220.0, 3.0), SR).unwrap();
    assert_eq!(a.deviation.reliability, 1.0);
    assert!(
        a.deviation.raw_score > corpus_mean,
        "tone {} vs corpus {}",
        a.deviation.raw_score,
        corpus_mean
    );
    assert_eq!(a.decision.classification, Classification::AiGenerated);
    assert_ne!(a.decision.risk_level, RiskLevel::Low);
}

#[test]
fn short_and_empty_inputs_are_rejected() {
    let f = fixture();
    let detector = VoiceDetector::from_config(f.config.clone()).unwrap();
    assert!(matches!(detector.analyze(&[], SR), Err(DetectorError::EmptySignal)));
    assert!(matches!(
        detector.analyze(&pure_tone(200.0, 0.2), SR),
        Err(DetectorError::InsufficientSignal(_))
    ));
    assert!(matches!(
        detector.analyze(&pure_tone(200.0, 1.0), 8_000),
        Err(DetectorError::UnsupportedSampleRate { .. })
    ));
}

#[test]
fn shared_across_threads_and_reloaded() {
    let f = fixture();
    let detector = Arc::new(VoiceDetector::from_config(f.config.clone()).unwrap());
    let tone = Arc::new(pure_tone(180.0, 0.8));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let d = detector.clone();
            let s = tone.clone();
            std::thread::spawn(move || d.analyze(&s, SR).unwrap().decision.anomaly_score)
        })
        .collect();
    let scores: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] == w[1]));

    // A much wider baseline pulls every z-score towards zero.
    let wide = BaselineProfile::from_stats(FeatureKey::all().map(|k| {
        let s = *detector.snapshot().scorer.profile().stats(k);
        (k, voxguard::profile::FeatureStats::with_mean_std(s.mean, s.std * 100.0))
    }));
    let thresholds = CalibratedThresholds::load(&f.config.thresholds_path).unwrap();
    detector.reload(wide, thresholds).unwrap();
    let after = detector.analyze(&tone, SR).unwrap();
    assert!(after.decision.anomaly_score < scores[0]);
}
