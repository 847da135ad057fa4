//! Diagnostics go to stderr through tracing; results go to stdout as one
//! JSON object per line (ndjson) so they can be piped without interleaving.

use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// One result line: the input it belongs to plus either a body or an error.
#[derive(Serialize)]
pub struct OutputLine<'a, T: Serialize> {
    pub source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: Option<T>,
}

impl<'a, T: Serialize> OutputLine<'a, T> {
    pub fn ok(source: &'a str, body: T) -> Self {
        Self {
            source,
            error: None,
            body: Some(body),
        }
    }

    pub fn failed(source: &'a str, error: impl ToString) -> Self {
        Self {
            source,
            error: Some(error.to_string()),
            body: None,
        }
    }
}

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber on stderr; level from RUST_LOG or `default_level`.
    /// A second call is a no-op.
    pub fn init(json: bool, default_level: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let registry = tracing_subscriber::registry().with(filter);
        let result = if json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(FmtSpan::NONE)
                        .with_writer(std::io::stderr),
                )
                .try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
        };
        if result.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }

    /// Write one JSON line; serialization or write failures are dropped.
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) {
        if let Ok(line) = serde_json::to_string(event) {
            let _ = writeln!(w, "{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{Classification, PublicVerdict};

    #[test]
    fn output_line_flattens_body() {
        let mut buf = Vec::new();
        let verdict = PublicVerdict {
            classification: Classification::Human,
            confidence: 0.912,
        };
        StructuredLogger::emit_json(&OutputLine::ok("a.f32", verdict), &mut buf);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "{\"source\":\"a.f32\",\"classification\":\"HUMAN\",\"confidence\":0.912}\n"
        );
    }

    #[test]
    fn output_line_reports_error() {
        let mut buf = Vec::new();
        StructuredLogger::emit_json(&OutputLine::<PublicVerdict>::failed("b.f32", "voxguard: empty signal"), &mut buf);
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["source"], "b.f32");
        assert_eq!(v["error"], "voxguard: empty signal");
        assert!(v.get("classification").is_none());
    }
}
