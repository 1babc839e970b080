//! Tracing setup and structured session logging.
//!
//! stdout carries the native messaging protocol, so every log line goes to
//! stderr.

use tracing::{debug, error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tsmerge_models::{MergeOutcome, MergeRequest, SessionId};

/// Install the global tracing subscriber.
///
/// `LOG_FORMAT=json` switches to JSON lines; `RUST_LOG` adds filter directives
/// on top of the `tsmerge=info` default.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    // Target matching is by prefix, so this covers every tsmerge_* crate
    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "tsmerge=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Structured log lines for one merge session.
///
/// Every line carries the session ID, so interleaved logs of concurrent
/// sessions can be told apart.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
}

impl SessionLogger {
    pub fn new(session_id: &SessionId) -> Self {
        Self {
            session_id: session_id.to_string(),
        }
    }

    pub fn log_start(&self, request: &MergeRequest) {
        info!(
            session_id = %self.session_id,
            segments = request.segments.len(),
            filename = %request.filename,
            quality = %request.quality,
            "Merge session started"
        );
    }

    pub fn log_phase(&self, phase: &str) {
        debug!(session_id = %self.session_id, phase, "Entering phase");
    }

    pub fn log_warning(&self, message: &str) {
        warn!(session_id = %self.session_id, "{}", message);
    }

    pub fn log_failure(&self, kind: &str, message: &str) {
        error!(
            session_id = %self.session_id,
            kind,
            "Merge session failed: {}", message
        );
    }

    pub fn log_completion(&self, outcome: &MergeOutcome) {
        info!(
            session_id = %self.session_id,
            output_file = outcome.output_file.as_deref().unwrap_or_default(),
            downloaded = outcome.segments_downloaded.unwrap_or_default(),
            failed = outcome.segments_failed.unwrap_or_default(),
            size_mb = outcome.file_size_mb.unwrap_or_default(),
            "Merge session completed"
        );
    }

    /// Span the session future is instrumented with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("merge_session", session_id = %self.session_id)
    }
}
