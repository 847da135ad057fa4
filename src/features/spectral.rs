//! Spectral group: cepstral summary plus centroid, bandwidth, flatness,
//! rolloff, contrast and flux over a Hann-windowed STFT.

use super::frames::{hann_window, FrameGrid};
use super::layout::MFCC_COUNT;
use ndarray::{Array1, Array2, Axis};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

const POWER_FLOOR: f64 = 1e-10;
const TOP_DB: f64 = 80.0;
/// Fraction of bins forming the peak and valley bands of spectral contrast.
const CONTRAST_QUANTILE: f64 = 0.02;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SpectralSummary {
    pub mfcc_mean: [f64; MFCC_COUNT],
    pub mfcc_std: [f64; MFCC_COUNT],
    pub centroid: f64,
    pub bandwidth: f64,
    pub flatness: f64,
    pub rolloff: f64,
    pub contrast: f64,
    pub flux: f64,
}

pub(crate) struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    frame_length: usize,
    /// n_mels x n_bins
    mel_filters: Array2<f64>,
    /// MFCC_COUNT x n_mels
    dct: Array2<f64>,
    bin_freqs: Array1<f64>,
    rolloff_percent: f64,
}

impl SpectralAnalyzer {
    pub(crate) fn new(sample_rate: u32, frame_length: usize, n_mels: usize, rolloff_percent: f64) -> Self {
        let n_bins = frame_length / 2 + 1;
        let sr = sample_rate as f64;
        Self {
            fft: FftPlanner::<f64>::new().plan_fft_forward(frame_length),
            window: hann_window(frame_length),
            frame_length,
            mel_filters: build_mel_filters(frame_length, sr, n_mels, 0.0, sr / 2.0),
            dct: build_dct(MFCC_COUNT, n_mels),
            bin_freqs: Array1::from_iter((0..n_bins).map(|k| k as f64 * sr / frame_length as f64)),
            rolloff_percent,
        }
    }

    /// Magnitude spectrogram, frames x bins.
    pub(crate) fn magnitude(&self, grid: &FrameGrid) -> Array2<f64> {
        let n_bins = self.frame_length / 2 + 1;
        let mut out = Array2::<f64>::zeros((grid.len(), n_bins));
        let mut buf = vec![Complex::new(0.0f64, 0.0); self.frame_length];

        for (t, frame) in grid.iter().enumerate() {
            for (slot, (&x, &w)) in buf.iter_mut().zip(frame.iter().zip(self.window.iter())) {
                *slot = Complex::new(x * w, 0.0);
            }
            self.fft.process(&mut buf);
            for (k, v) in out.row_mut(t).iter_mut().enumerate() {
                *v = buf[k].norm();
            }
        }
        out
    }

    pub(crate) fn summarize(&self, magnitude: &Array2<f64>) -> SpectralSummary {
        let n_frames = magnitude.nrows();
        if n_frames == 0 {
            return SpectralSummary::default();
        }
        let power = magnitude.mapv(|m| m * m);

        let mfcc = self.mfcc(&power);
        let mut summary = SpectralSummary::default();
        if let Some(means) = mfcc.mean_axis(Axis(0)) {
            for (dst, src) in summary.mfcc_mean.iter_mut().zip(means.iter()) {
                *dst = *src;
            }
        }
        let stds = mfcc.std_axis(Axis(0), 0.0);
        for (dst, src) in summary.mfcc_std.iter_mut().zip(stds.iter()) {
            *dst = *src;
        }

        let mut centroid = 0.0;
        let mut bandwidth = 0.0;
        let mut flatness = 0.0;
        let mut rolloff = 0.0;
        let mut contrast = 0.0;
        for (mag, pow) in magnitude.outer_iter().zip(power.outer_iter()) {
            let (c, b) = self.centroid_bandwidth(mag.as_slice().unwrap_or(&[]));
            centroid += c;
            bandwidth += b;
            flatness += spectral_flatness(pow.as_slice().unwrap_or(&[]));
            rolloff += self.rolloff(mag.as_slice().unwrap_or(&[]));
            contrast += spectral_contrast(pow.as_slice().unwrap_or(&[]));
        }
        let n = n_frames as f64;
        summary.centroid = centroid / n;
        summary.bandwidth = bandwidth / n;
        summary.flatness = flatness / n;
        summary.rolloff = rolloff / n;
        summary.contrast = contrast / n;
        summary.flux = spectral_flux(magnitude);
        summary
    }

    /// Orthonormal DCT-II of the dB mel spectrogram, frames x MFCC_COUNT.
    fn mfcc(&self, power: &Array2<f64>) -> Array2<f64> {
        let mel = power.dot(&self.mel_filters.t());
        let mut db = mel.mapv(|p| 10.0 * p.max(POWER_FLOOR).log10());
        let peak = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        db.mapv_inplace(|v| v.max(peak - TOP_DB));
        db.dot(&self.dct.t())
    }

    fn centroid_bandwidth(&self, mag: &[f64]) -> (f64, f64) {
        let total: f64 = mag.iter().sum();
        if total <= 0.0 {
            return (0.0, 0.0);
        }
        let freqs = self.bin_freqs.as_slice().unwrap_or(&[]);
        let centroid = mag.iter().zip(freqs).map(|(m, f)| m * f).sum::<f64>() / total;
        let spread = mag
            .iter()
            .zip(freqs)
            .map(|(m, f)| (m / total) * (f - centroid) * (f - centroid))
            .sum::<f64>();
        (centroid, spread.sqrt())
    }

    fn rolloff(&self, mag: &[f64]) -> f64 {
        let total: f64 = mag.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        let target = self.rolloff_percent * total;
        let mut acc = 0.0;
        for (k, m) in mag.iter().enumerate() {
            acc += m;
            if acc >= target {
                return self.bin_freqs[k];
            }
        }
        self.bin_freqs[self.bin_freqs.len() - 1]
    }
}

/// Geometric over arithmetic mean of the floored power spectrum.
fn spectral_flatness(power: &[f64]) -> f64 {
    if power.is_empty() {
        return 0.0;
    }
    let n = power.len() as f64;
    let log_mean = power.iter().map(|p| p.max(POWER_FLOOR).ln()).sum::<f64>() / n;
    let arith = power.iter().map(|p| p.max(POWER_FLOOR)).sum::<f64>() / n;
    log_mean.exp() / arith
}

/// Peak-to-valley ratio in dB between the loudest and quietest bins.
fn spectral_contrast(power: &[f64]) -> f64 {
    if power.is_empty() {
        return 0.0;
    }
    let mut sorted = power.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let band = ((sorted.len() as f64 * CONTRAST_QUANTILE).round() as usize).max(1);
    let valley = sorted[..band].iter().sum::<f64>() / band as f64;
    let peak = sorted[sorted.len() - band..].iter().sum::<f64>() / band as f64;
    10.0 * (peak.max(POWER_FLOOR).log10() - valley.max(POWER_FLOOR).log10())
}

/// Mean L2 distance between consecutive sum-normalised magnitude spectra.
fn spectral_flux(magnitude: &Array2<f64>) -> f64 {
    if magnitude.nrows() < 2 {
        return 0.0;
    }
    let normalized: Vec<Array1<f64>> = magnitude
        .outer_iter()
        .map(|row| {
            let total = row.sum();
            if total > 0.0 {
                row.mapv(|m| m / total)
            } else {
                Array1::zeros(row.len())
            }
        })
        .collect();
    let total: f64 = normalized
        .windows(2)
        .map(|w| (&w[1] - &w[0]).mapv(|d| d * d).sum().sqrt())
        .sum();
    total / (normalized.len() - 1) as f64
}

fn hz_to_mel_slaney(hz: f64) -> f64 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1_000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f64.ln() / 27.0;
    if hz >= min_log_hz {
        min_log_mel + (hz / min_log_hz).ln() / logstep
    } else {
        hz / f_sp
    }
}

fn mel_to_hz_slaney(mel: f64) -> f64 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1_000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f64.ln() / 27.0;
    if mel >= min_log_mel {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    } else {
        mel * f_sp
    }
}

/// Slaney-normalised triangular mel filterbank, n_mels x (fft_size / 2 + 1).
fn build_mel_filters(fft_size: usize, sr: f64, n_mels: usize, fmin: f64, fmax: f64) -> Array2<f64> {
    let n_freqs = fft_size / 2 + 1;
    let mel_min = hz_to_mel_slaney(fmin);
    let mel_max = hz_to_mel_slaney(fmax);
    let hz_pts: Vec<f64> = (0..=(n_mels + 1))
        .map(|i| mel_to_hz_slaney(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut filters = Array2::<f64>::zeros((n_mels, n_freqs));
    for m in 0..n_mels {
        let lower = hz_pts[m];
        let center = hz_pts[m + 1];
        let upper = hz_pts[m + 2];
        let down = (center - lower).max(1e-10);
        let up = (upper - center).max(1e-10);
        let enorm = 2.0 / (upper - lower).max(1e-10);

        for k in 0..n_freqs {
            let freq = k as f64 * sr / fft_size as f64;
            let w = if freq >= lower && freq <= center {
                (freq - lower) / down
            } else if freq > center && freq <= upper {
                (upper - freq) / up
            } else {
                0.0
            };
            filters[[m, k]] = (w * enorm).max(0.0);
        }
    }
    filters
}

/// Orthonormal DCT-II basis, n_out x n_in.
fn build_dct(n_out: usize, n_in: usize) -> Array2<f64> {
    use std::f64::consts::PI;
    let n = n_in as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dct_rows_are_orthonormal() {
        let d = build_dct(13, 128);
        let gram = d.dot(&d.t());
        for i in 0..13 {
            for j in 0..13 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn mel_scale_round_trips() {
        for hz in [0.0, 440.0, 1_000.0, 4_000.0, 8_000.0] {
            assert!((mel_to_hz_slaney(hz_to_mel_slaney(hz)) - hz).abs() < 1e-6);
        }
    }

    #[test]
    fn flatness_separates_tone_from_white_spectrum() {
        let flat = vec![1.0; 64];
        let mut peaky = vec![1e-6; 64];
        peaky[10] = 1.0;
        assert!((spectral_flatness(&flat) - 1.0).abs() < 1e-12);
        assert!(spectral_flatness(&peaky) < 0.01);
        assert!(spectral_contrast(&peaky) > spectral_contrast(&flat));
    }

    #[test]
    fn flux_is_zero_for_stationary_spectrum() {
        let mag = Array2::from_elem((5, 33), 0.25);
        assert_eq!(spectral_flux(&mag), 0.0);
    }
}
