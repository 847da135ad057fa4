//! Feature extraction pipeline: waveform → frame grid → spectral / prosodic / temporal groups → vector.

use super::frames::FrameGrid;
use super::layout::{FeatureKey, MFCC_COUNT};
use super::prosodic::PitchTracker;
use super::quality::{self, SignalQuality};
use super::spectral::SpectralAnalyzer;
use super::temporal;
use super::FeatureVector;
use crate::config::FeaturesConfig;
use crate::error::{DetectorError, Result};

/// Stateless after construction; share one instance across workers.
pub struct FeatureExtractor {
    config: FeaturesConfig,
    spectral: SpectralAnalyzer,
    pitch: PitchTracker,
}

impl FeatureExtractor {
    pub fn new(config: FeaturesConfig) -> Result<Self> {
        validate(&config)?;
        let spectral = SpectralAnalyzer::new(
            config.sample_rate,
            config.frame_length,
            config.n_mels,
            config.rolloff_percent,
        );
        let pitch = PitchTracker::new(
            config.sample_rate,
            config.frame_length,
            config.fmin_hz,
            config.fmax_hz,
            config.voicing_threshold,
            config.voicing_rms_floor,
        );
        Ok(Self {
            config,
            spectral,
            pitch,
        })
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }

    /// Extract the full feature vector from a mono waveform in [-1, 1].
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<FeatureVector> {
        self.extract_with_quality(samples, sample_rate).map(|(v, _)| v)
    }

    /// Feature vector plus the quality hints measured on the same spectrogram.
    pub fn extract_with_quality(&self, samples: &[f32], sample_rate: u32) -> Result<(FeatureVector, SignalQuality)> {
        if samples.is_empty() {
            return Err(DetectorError::EmptySignal);
        }
        if sample_rate != self.config.sample_rate {
            return Err(DetectorError::UnsupportedSampleRate {
                expected: self.config.sample_rate,
                actual: sample_rate,
            });
        }
        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(DetectorError::InsufficientSignal(format!(
                "non-finite sample at index {}",
                pos
            )));
        }

        let grid = FrameGrid::new(samples, self.config.frame_length, self.config.hop_length);
        let rms = grid.rms();

        let magnitude = self.spectral.magnitude(&grid);
        let quality = SignalQuality::new(
            quality::estimate_snr_db(&magnitude, samples.len()),
            quality::duration_secs(samples.len(), sample_rate),
        );
        let spectral = self.spectral.summarize(&magnitude);
        let prosodic = self.pitch.summarize(&grid, &rms);
        let temporal = temporal::summarize(&grid, &rms);

        let mut v = FeatureVector::new();
        for i in 0..MFCC_COUNT {
            v.set(FeatureKey::mfcc_mean(i), spectral.mfcc_mean[i]);
            v.set(FeatureKey::mfcc_std(i), spectral.mfcc_std[i]);
        }
        v.set(FeatureKey::CENTROID_MEAN, spectral.centroid);
        v.set(FeatureKey::BANDWIDTH_MEAN, spectral.bandwidth);
        v.set(FeatureKey::FLATNESS_MEAN, spectral.flatness);
        v.set(FeatureKey::ROLLOFF_MEAN, spectral.rolloff);
        v.set(FeatureKey::CONTRAST_MEAN, spectral.contrast);
        v.set(FeatureKey::FLUX_MEAN, spectral.flux);
        v.set(FeatureKey::F0_MEAN, prosodic.f0_mean);
        v.set(FeatureKey::F0_STD, prosodic.f0_std);
        v.set(FeatureKey::JITTER, prosodic.jitter);
        v.set(FeatureKey::SHIMMER, prosodic.shimmer);
        v.set(FeatureKey::ZCR_MEAN, temporal.zcr_mean);
        v.set(FeatureKey::ENERGY_ENTROPY, temporal.energy_entropy);

        tracing::debug!(
            frames = grid.len(),
            f0_mean = prosodic.f0_mean,
            jitter = prosodic.jitter,
            shimmer = prosodic.shimmer,
            snr_db = quality.snr_db,
            "features extracted"
        );
        Ok((v, quality))
    }
}

fn validate(c: &FeaturesConfig) -> Result<()> {
    let fail = |msg: String| -> Result<()> { Err(DetectorError::Configuration(msg)) };
    if c.sample_rate == 0 {
        return fail("features.sample_rate must be positive".into());
    }
    if c.hop_length == 0 || c.frame_length < 2 || c.hop_length > c.frame_length {
        return fail(format!(
            "features: need 0 < hop_length ({}) <= frame_length ({})",
            c.hop_length, c.frame_length
        ));
    }
    if c.n_mels < MFCC_COUNT {
        return fail(format!("features.n_mels must be at least {}", MFCC_COUNT));
    }
    let nyquist = c.sample_rate as f64 / 2.0;
    if !(c.fmin_hz > 0.0 && c.fmin_hz < c.fmax_hz && c.fmax_hz <= nyquist) {
        return fail(format!(
            "features: need 0 < fmin_hz ({}) < fmax_hz ({}) <= {}",
            c.fmin_hz, c.fmax_hz, nyquist
        ));
    }
    let longest_period = (c.sample_rate as f64 / c.fmin_hz).ceil() as usize;
    if 2 * longest_period > c.frame_length {
        return fail(format!(
            "features.frame_length {} too short for fmin_hz {} (needs {})",
            c.frame_length,
            c.fmin_hz,
            2 * longest_period
        ));
    }
    if !(0.0..=1.0).contains(&c.rolloff_percent) || !(c.voicing_threshold > 0.0) {
        return fail("features: rolloff_percent must be in [0, 1] and voicing_threshold positive".into());
    }
    Ok(())
}
