//! Centred, overlapping analysis frames shared by every feature group so that
//! per-frame pitch, energy and spectra line up index for index.

pub(crate) struct FrameGrid {
    padded: Vec<f64>,
    frame_length: usize,
    hop_length: usize,
    count: usize,
}

impl FrameGrid {
    /// Zero-pads `frame_length / 2` on both sides so frame `i` is centred on sample `i * hop`.
    pub(crate) fn new(samples: &[f32], frame_length: usize, hop_length: usize) -> Self {
        let pad = frame_length / 2;
        let mut padded = Vec::with_capacity(samples.len() + frame_length);
        padded.resize(pad, 0.0);
        padded.extend(samples.iter().map(|&s| s as f64));
        padded.resize(samples.len() + frame_length, 0.0);
        let count = 1 + samples.len() / hop_length;
        Self {
            padded,
            frame_length,
            hop_length,
            count,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn frame(&self, i: usize) -> &[f64] {
        let start = i * self.hop_length;
        &self.padded[start..start + self.frame_length]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.count).map(move |i| self.frame(i))
    }

    /// Root-mean-square amplitude per frame.
    pub(crate) fn rms(&self) -> Vec<f64> {
        self.iter().map(rms).collect()
    }
}

pub(crate) fn rms(frame: &[f64]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|x| x * x).sum::<f64>() / frame.len() as f64).sqrt()
}

/// Periodic Hann window.
pub(crate) fn hann_window(n: usize) -> Vec<f64> {
    use std::f64::consts::PI;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / n as f64).cos()))
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64).sqrt()
}
