//! Raw PCM input: little-endian f32 mono files, optionally discovered by walking directories.

use crate::error::{DetectorError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions picked up when an input path is a directory.
pub const PCM_EXTENSIONS: [&str; 2] = ["f32", "pcm"];

/// Decode raw little-endian f32 samples.
pub fn decode_f32le(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(DetectorError::MalformedInput(format!(
            "{} bytes is not a whole number of f32 samples",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn is_pcm(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| PCM_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Expand inputs: files are kept as given, directories are walked for PCM
/// files in sorted order. Unreadable directory entries are skipped with a warning.
pub fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            out.push(input.clone());
            continue;
        }
        for entry in WalkDir::new(input).follow_links(false).sort_by_file_name() {
            match entry {
                Ok(e) if e.file_type().is_file() && is_pcm(e.path()) => out.push(e.into_path()),
                Ok(_) => {}
                Err(e) => tracing::warn!(root = %input.display(), error = %e, "skipping entry"),
            }
        }
    }
    out
}
