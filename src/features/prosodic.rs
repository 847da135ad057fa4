//! Prosodic group: YIN pitch track over voiced frames, F0 statistics,
//! jitter (period instability) and shimmer (amplitude instability).

use super::frames::{mean, std_dev, FrameGrid};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ProsodicSummary {
    pub f0_mean: f64,
    pub f0_std: f64,
    pub jitter: f64,
    pub shimmer: f64,
}

pub(crate) struct PitchTracker {
    sample_rate: f64,
    fmin: f64,
    fmax: f64,
    tau_min: usize,
    tau_max: usize,
    threshold: f64,
    rms_floor: f64,
}

impl PitchTracker {
    /// `frame_length` must exceed twice the longest period searched.
    pub(crate) fn new(
        sample_rate: u32,
        frame_length: usize,
        fmin: f64,
        fmax: f64,
        threshold: f64,
        rms_floor: f64,
    ) -> Self {
        let sr = sample_rate as f64;
        let tau_min = ((sr / fmax).floor() as usize).max(2);
        let tau_max = ((sr / fmin).ceil() as usize).min(frame_length / 2);
        Self {
            sample_rate: sr,
            fmin,
            fmax,
            tau_min,
            tau_max,
            threshold,
            rms_floor,
        }
    }

    /// F0 in Hz when the frame is voiced.
    pub(crate) fn estimate(&self, frame: &[f64], frame_rms: f64) -> Option<f64> {
        if frame_rms < self.rms_floor || self.tau_max <= self.tau_min {
            return None;
        }
        let cmnd = self.cumulative_mean_normalized_difference(frame);

        let mut tau = (self.tau_min..=self.tau_max).find(|&t| cmnd[t] < self.threshold)?;
        while tau < self.tau_max && cmnd[tau + 1] < cmnd[tau] {
            tau += 1;
        }

        let shift = if tau > 1 && tau < self.tau_max {
            let (a, b, c) = (cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
            let denom = a - 2.0 * b + c;
            if denom.abs() > f64::EPSILON {
                (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
            } else {
                0.0
            }
        } else {
            0.0
        };

        let f0 = self.sample_rate / (tau as f64 + shift);
        (f0 >= self.fmin && f0 <= self.fmax).then_some(f0)
    }

    fn cumulative_mean_normalized_difference(&self, frame: &[f64]) -> Vec<f64> {
        let window = frame.len().saturating_sub(self.tau_max);
        let mut out = vec![1.0; self.tau_max + 1];
        let mut running = 0.0;
        for tau in 1..=self.tau_max {
            let d: f64 = frame[..window]
                .iter()
                .zip(&frame[tau..tau + window])
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            running += d;
            out[tau] = if running > 0.0 {
                d * tau as f64 / running
            } else {
                1.0
            };
        }
        out
    }

    /// Pitch and amplitude statistics over voiced frames. `rms[i]` belongs to frame `i`.
    pub(crate) fn summarize(&self, grid: &FrameGrid, rms: &[f64]) -> ProsodicSummary {
        let mut f0s = Vec::new();
        let mut voiced_rms = Vec::new();
        for (frame, &r) in grid.iter().zip(rms) {
            if let Some(f0) = self.estimate(frame, r) {
                f0s.push(f0);
                voiced_rms.push(r);
            }
        }

        if f0s.len() < 2 {
            return ProsodicSummary::default();
        }

        let periods: Vec<f64> = f0s.iter().map(|f| 1.0 / f).collect();
        ProsodicSummary {
            f0_mean: mean(&f0s),
            f0_std: std_dev(&f0s),
            jitter: relative_mean_abs_diff(&periods),
            shimmer: relative_mean_abs_diff(&voiced_rms),
        }
    }
}

/// Mean absolute difference between consecutive values, over the mean value.
fn relative_mean_abs_diff(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    if m <= 0.0 {
        return 0.0;
    }
    let diffs: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    diffs / (values.len() - 1) as f64 / m
}
