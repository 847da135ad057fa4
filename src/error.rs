//! Error taxonomy shared by the extractor, profile loaders, scorer and engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    /// Missing or malformed profile, thresholds or tunables. Fatal at startup.
    #[error("voxguard: configuration error: {0}")]
    Configuration(String),

    #[error("voxguard: empty signal")]
    EmptySignal,

    #[error("voxguard: insufficient signal: {0}")]
    InsufficientSignal(String),

    #[error("voxguard: unsupported sample rate {actual} Hz (expected {expected} Hz)")]
    UnsupportedSampleRate { expected: u32, actual: u32 },

    #[error("voxguard: malformed input: {0}")]
    MalformedInput(String),

    /// Offline profile building or threshold calibration could not proceed.
    #[error("voxguard: calibration error: {0}")]
    Calibration(String),

    #[error("voxguard: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("voxguard: json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DetectorError>;
