//! voxguard CLI: extract features, build the human baseline, calibrate
//! thresholds and analyze recordings. Inputs are raw little-endian f32 mono
//! PCM at the configured sample rate; results are JSON lines on stdout.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use voxguard::{
    config::DetectorConfig,
    detector::check_duration,
    features::{FeatureExtractor, FeatureVector},
    input::{collect_inputs, decode_f32le},
    logging::{OutputLine, StructuredLogger},
    profile::{BaselineProfile, CalibratedThresholds},
    risk::{AnomalyScorer, PublicVerdict},
    VoiceDetector,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "voxguard")]
#[command(about = "Detect AI-generated speech by deviation from a human acoustic baseline")]
#[command(version)]
struct Cli {
    /// Detector configuration (JSON); defaults are used if it is missing
    #[arg(long, global = true, env = "VOXGUARD_CONFIG_PATH", default_value = "voxguard.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the feature vector of each input
    Extract {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Build the human baseline profile from verified-human recordings
    BuildProfile {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Calibrate decision thresholds on held-out human recordings
    Calibrate {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Classify each input as human or AI-generated
    Analyze {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Print only classification and confidence
        #[arg(long)]
        public: bool,
    },
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let config = DetectorConfig::load(&cli.config)?;
    StructuredLogger::init(config.log.json, &config.log.level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli.command, config))
}

async fn run(command: Command, config: DetectorConfig) -> Result<(), BoxError> {
    let sample_rate = config.features.sample_rate;
    let limit = config.limits.concurrency();

    match command {
        Command::Extract { inputs } => {
            let extractor = Arc::new(FeatureExtractor::new(config.features.clone())?);
            let results = run_batch(collect_inputs(&inputs), limit, move |samples| {
                extractor.extract(&samples, sample_rate)
            })
            .await;
            emit_all(&results);
        }

        Command::BuildProfile { inputs, out } => {
            let extractor = Arc::new(FeatureExtractor::new(config.features.clone())?);
            let results = run_batch(collect_inputs(&inputs), limit, move |samples| {
                extractor.extract(&samples, sample_rate)
            })
            .await;
            let corpus: Vec<FeatureVector> = successes(results);
            let profile = BaselineProfile::build(&corpus)?;
            profile.save(&out)?;
            info!(out = %out.display(), samples = corpus.len(), "baseline profile written");
            emit_one(
                &out.display().to_string(),
                serde_json::json!({
                    "sample_count": profile.sample_count(),
                    "active_features": profile.active_keys().count(),
                    "digest": profile.digest(),
                }),
            );
        }

        Command::Calibrate { inputs, out } => {
            let profile = BaselineProfile::load(&config.profile_path)?;
            let scorer = AnomalyScorer::new(Arc::new(profile));
            let extractor = Arc::new(FeatureExtractor::new(config.features.clone())?);
            let min_duration = config.limits.min_duration_secs;
            let results = run_batch(collect_inputs(&inputs), limit, move |samples| {
                check_duration(samples.len(), sample_rate, min_duration)?;
                let (features, quality) = extractor.extract_with_quality(&samples, sample_rate)?;
                Ok(scorer.score(&features, quality.snr_db, quality.duration_secs).final_score)
            })
            .await;
            let scores: Vec<f64> = successes(results);
            let thresholds = CalibratedThresholds::calibrate(&scores)?;
            thresholds.save(&out)?;
            info!(out = %out.display(), samples = scores.len(), "thresholds written");
            emit_one(&out.display().to_string(), thresholds);
        }

        Command::Analyze { inputs, public } => {
            let detector = Arc::new(VoiceDetector::from_config(config)?);
            let results = run_batch(collect_inputs(&inputs), limit, move |samples| {
                detector.analyze(&samples, sample_rate)
            })
            .await;
            if public {
                let verdicts: Vec<_> = results
                    .into_iter()
                    .map(|(p, r)| (p, r.map(|a| PublicVerdict::from(&a.decision))))
                    .collect();
                emit_all(&verdicts);
            } else {
                emit_all(&results);
            }
        }
    }
    Ok(())
}

type BatchResult<T> = Vec<(PathBuf, voxguard::Result<T>)>;

/// Read each file and run `job` on the blocking pool, at most `limit` at a
/// time. Results come back in input order.
async fn run_batch<T, F>(paths: Vec<PathBuf>, limit: usize, job: F) -> BatchResult<T>
where
    T: Send + 'static,
    F: Fn(Vec<f32>) -> voxguard::Result<T> + Send + Sync + 'static,
{
    let job = Arc::new(job);
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let mut set = JoinSet::new();

    for (idx, path) in paths.iter().cloned().enumerate() {
        let job = job.clone();
        let permits = permits.clone();
        set.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let result = match tokio::fs::read(&path).await {
                Ok(bytes) => match decode_f32le(&bytes) {
                    Ok(samples) => tokio::task::spawn_blocking(move || job(samples))
                        .await
                        .unwrap_or_else(|e| Err(std::io::Error::other(e).into())),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e.into()),
            };
            (idx, result)
        });
    }

    let mut slots: Vec<Option<voxguard::Result<T>>> = paths.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, result)) => slots[idx] = Some(result),
            Err(e) => warn!(error = %e, "analysis task failed"),
        }
    }

    paths
        .into_iter()
        .zip(slots)
        .map(|(path, slot)| {
            let result = slot.unwrap_or_else(|| {
                Err(std::io::Error::other("analysis task did not complete").into())
            });
            (path, result)
        })
        .collect()
}

/// Keep successful results; failures are logged and skipped.
fn successes<T>(results: BatchResult<T>) -> Vec<T> {
    results
        .into_iter()
        .filter_map(|(path, result)| match result {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(input = %path.display(), error = %e, "input skipped");
                None
            }
        })
        .collect()
}

fn emit_all<T: serde::Serialize>(results: &[(PathBuf, voxguard::Result<T>)]) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (path, result) in results {
        let source = path.display().to_string();
        match result {
            Ok(body) => StructuredLogger::emit_json(&OutputLine::ok(&source, body), &mut out),
            Err(e) => {
                warn!(input = %source, error = %e, "input failed");
                StructuredLogger::emit_json(&OutputLine::<&T>::failed(&source, e), &mut out);
            }
        }
    }
    let _ = out.flush();
}

fn emit_one(source: &str, body: impl serde::Serialize) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    StructuredLogger::emit_json(&OutputLine::ok(source, body), &mut out);
    let _ = out.flush();
}
