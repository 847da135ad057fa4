//! voxguard — statistical detector for AI-generated speech.
//!
//! A recording is reduced to a fixed set of acoustic measurements, compared
//! feature by feature against a profile learned from verified human speech,
//! and classified by how far it strays beyond calibrated human variability.
//!
//! Modular structure:
//! - [`features`] — Spectral, prosodic and temporal feature extraction; SNR and duration hints
//! - [`profile`] — Human baseline statistics and calibrated thresholds
//! - [`risk`] — Anomaly scoring, decision engine, explanations
//! - [`detector`] — End-to-end facade with hot-swappable state
//! - [`input`] — Raw PCM decoding and input discovery
//! - [`logging`] — Structured logging and JSON result lines

pub mod config;
pub mod detector;
pub mod error;
pub mod features;
pub mod input;
pub mod logging;
pub mod profile;
pub mod risk;

pub use config::DetectorConfig;
pub use detector::{Analysis, VoiceDetector};
pub use error::{DetectorError, Result};
pub use features::{FeatureExtractor, FeatureKey, FeatureVector, SignalQuality};
pub use logging::StructuredLogger;
pub use profile::{BaselineProfile, CalibratedThresholds};
pub use risk::{AnomalyScorer, Classification, DecisionEngine, DecisionRecord, PublicVerdict};
