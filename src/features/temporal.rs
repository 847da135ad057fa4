//! Temporal group: zero-crossing rate and short-term energy entropy.

use super::frames::FrameGrid;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct TemporalSummary {
    pub zcr_mean: f64,
    pub energy_entropy: f64,
}

pub(crate) fn summarize(grid: &FrameGrid, rms: &[f64]) -> TemporalSummary {
    let zcr: Vec<f64> = grid.iter().map(zero_crossing_rate).collect();
    let zcr_mean = if zcr.is_empty() {
        0.0
    } else {
        zcr.iter().sum::<f64>() / zcr.len() as f64
    };
    TemporalSummary {
        zcr_mean,
        energy_entropy: energy_entropy(rms),
    }
}

/// Sign changes per sample; zero counts as positive.
fn zero_crossing_rate(frame: &[f64]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f64 / frame.len() as f64
}

/// Shannon entropy (nats) of per-frame energy treated as a distribution.
fn energy_entropy(rms: &[f64]) -> f64 {
    let energy: Vec<f64> = rms.iter().map(|r| r * r).collect();
    let total: f64 = energy.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    -energy
        .iter()
        .map(|e| e / total)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.ln())
        .sum::<f64>()
}
