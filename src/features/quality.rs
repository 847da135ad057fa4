//! Signal quality hints handed to the scorer: estimated SNR and duration.
//!
//! The noise floor is read off the same magnitude spectrogram the spectral
//! group uses. Within a frame, voiced energy sits in a handful of harmonic
//! bins while broadband noise lifts every bin, so the median bin power tracks
//! the noise. For white noise the bin powers are exponentially distributed
//! and the median is `ln 2` times the mean, hence the correction below.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Upper bound on the estimate; also reported when the noise floor is exactly zero.
pub(crate) const SNR_CEILING_DB: f64 = 50.0;
/// Below this many samples the noise floor estimate is meaningless.
const MIN_SNR_SAMPLES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalQuality {
    pub snr_db: f64,
    pub duration_secs: f64,
}

impl SignalQuality {
    pub fn new(snr_db: f64, duration_secs: f64) -> Self {
        Self {
            snr_db,
            duration_secs,
        }
    }
}

pub(crate) fn duration_secs(n_samples: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    n_samples as f64 / sample_rate as f64
}

/// SNR in dB from a frames x bins magnitude spectrogram: total power over the
/// per-frame median-bin noise floor. Silent input is 0 dB.
pub(crate) fn estimate_snr_db(magnitude: &Array2<f64>, n_samples: usize) -> f64 {
    let n_bins = magnitude.ncols();
    if n_samples < MIN_SNR_SAMPLES || n_bins == 0 {
        return 0.0;
    }
    let mut signal = 0.0;
    let mut noise = 0.0;
    let mut power = Vec::with_capacity(n_bins);
    for row in magnitude.outer_iter() {
        power.clear();
        power.extend(row.iter().map(|m| m * m));
        signal += power.iter().sum::<f64>();
        let mid = n_bins / 2;
        let (_, median, _) =
            power.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        noise += *median * n_bins as f64 / std::f64::consts::LN_2;
    }
    if signal <= 0.0 {
        return 0.0;
    }
    if noise <= 0.0 {
        return SNR_CEILING_DB;
    }
    (10.0 * (signal / noise).log10()).min(SNR_CEILING_DB)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(rows: usize, f: impl Fn(usize) -> f64) -> Array2<f64> {
        Array2::from_shape_fn((rows, 257), |(_, k)| f(k))
    }

    #[test]
    fn short_input_has_zero_snr() {
        assert_eq!(estimate_snr_db(&spectrum(4, |_| 1.0), 50), 0.0);
        assert!((duration_secs(50, 16_000) - 50.0 / 16_000.0).abs() < 1e-12);
        assert_eq!(duration_secs(50, 0), 0.0);
    }

    #[test]
    fn silence_is_zero_db() {
        assert_eq!(estimate_snr_db(&spectrum(4, |_| 0.0), 16_000), 0.0);
    }

    #[test]
    fn peaked_spectrum_over_empty_floor_hits_ceiling() {
        let s = spectrum(4, |k| if k == 20 { 3.0 } else { 0.0 });
        assert_eq!(estimate_snr_db(&s, 16_000), SNR_CEILING_DB);
    }

    #[test]
    fn flat_spectrum_is_near_zero_db() {
        // Every bin equal: signal n*p over noise n*p/ln2.
        let snr = estimate_snr_db(&spectrum(4, |_| 0.3), 16_000);
        assert!((snr - 10.0 * std::f64::consts::LN_2.log10()).abs() < 1e-9);
        assert!(snr < 0.0);
    }

    #[test]
    fn harmonics_above_floor_raise_snr() {
        let floor = estimate_snr_db(&spectrum(4, |_| 0.01), 16_000);
        let voiced = estimate_snr_db(
            &spectrum(4, |k| if k % 25 == 5 { 1.0 } else { 0.01 }),
            16_000,
        );
        assert!(voiced > floor + 20.0, "voiced {voiced} vs floor {floor}");
    }
}
