//! Merge session orchestration.
//!
//! A session takes one `merge_segments` request through validation, FFmpeg
//! lookup, download, concat list, output path resolution and merge, and
//! always ends with exactly one `result` message. Errors and panics inside a
//! session are turned into a failed result; they never reach the dispatcher.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, Instrument};

use tsmerge_media::{
    move_into_place, resolve_output_path, write_concat_list, FfmpegCommand, FfmpegLocator,
    FfmpegRunner, FragmentDownloader, FragmentProgress, MediaError, ProgressSink,
    CONCAT_LIST_NAME, DEFAULT_EXTENSION,
};
use tsmerge_models::{MergeOutcome, MergeRequest, OutboundMessage, SessionId};

use crate::channel::Outbox;
use crate::config::HostConfig;
use crate::error::{HostResult, SessionError, SessionResult};
use crate::logging::SessionLogger;

/// Prefix of per-session working directories.
pub const WORK_DIR_PREFIX: &str = "tsmerge_segments_";

/// Phases of a merge session, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Validate,
    LocateTool,
    Download,
    BuildManifest,
    ResolveOutput,
    Merge,
    Finalize,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Validate => "validate",
            SessionPhase::LocateTool => "locate_tool",
            SessionPhase::Download => "download",
            SessionPhase::BuildManifest => "build_manifest",
            SessionPhase::ResolveOutput => "resolve_output",
            SessionPhase::Merge => "merge",
            SessionPhase::Finalize => "finalize",
        }
    }
}

/// Shared, read-only dependencies of all sessions.
#[derive(Debug)]
pub struct SessionContext {
    pub config: HostConfig,
    pub locator: FfmpegLocator,
    pub downloader: FragmentDownloader,
    pub runner: FfmpegRunner,
}

impl SessionContext {
    /// Build the context from configuration.
    pub fn from_config(config: HostConfig) -> HostResult<Self> {
        let mut locator = FfmpegLocator::new();
        if let Some(path) = &config.ffmpeg_path {
            locator = locator.with_explicit_path(path);
        }

        let downloader = FragmentDownloader::new(&config.fetch_settings())?;

        let mut runner = FfmpegRunner::new();
        if let Some(timeout) = config.ffmpeg_timeout {
            runner = runner.with_timeout(timeout);
        }

        Ok(Self {
            config,
            locator,
            downloader,
            runner,
        })
    }
}

/// Forwards download progress to the extension.
struct OutboxProgress<'a> {
    outbox: &'a Outbox,
}

impl ProgressSink for OutboxProgress<'_> {
    fn emit(&self, progress: FragmentProgress) {
        let message = OutboundMessage::progress(progress.current, progress.total, progress.status);
        if self.outbox.send(message).is_err() {
            debug!("Outbox closed, dropping progress update");
        }
    }
}

/// One merge request from start to result.
pub struct MergeSession {
    id: SessionId,
    request: MergeRequest,
    ctx: Arc<SessionContext>,
    outbox: Outbox,
    logger: SessionLogger,
}

impl MergeSession {
    pub fn new(request: MergeRequest, ctx: Arc<SessionContext>, outbox: Outbox) -> Self {
        let id = SessionId::new();
        let logger = SessionLogger::new(&id);
        Self {
            id,
            request,
            ctx,
            outbox,
            logger,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Run the session and send its `result` message.
    ///
    /// Never fails: every error, including a panic, becomes a failed outcome.
    pub async fn run(self) -> MergeOutcome {
        let span = self.logger.create_span();
        self.logger.log_start(&self.request);

        let result = AssertUnwindSafe(self.execute())
            .catch_unwind()
            .instrument(span)
            .await
            .unwrap_or_else(|panic| Err(SessionError::Panicked(panic_message(panic))));

        let outcome = match result {
            Ok(outcome) => {
                self.logger.log_completion(&outcome);
                outcome
            }
            Err(e) => {
                self.logger.log_failure(e.kind(), &e.to_string());
                MergeOutcome::failed(e.to_string())
            }
        };

        self.send(OutboundMessage::result(outcome.clone()));
        outcome
    }

    async fn execute(&self) -> SessionResult<MergeOutcome> {
        self.enter(SessionPhase::Validate);
        if self.request.segments.is_empty() {
            return Err(SessionError::EmptySegmentList);
        }

        self.enter(SessionPhase::LocateTool);
        let ffmpeg = self
            .ctx
            .locator
            .locate()
            .ok_or(SessionError::FfmpegUnavailable)?;

        self.enter(SessionPhase::Download);
        tokio::fs::create_dir_all(&self.ctx.config.work_dir).await?;
        let work_dir = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir_in(&self.ctx.config.work_dir)?;
        debug!("Working directory: {}", work_dir.path().display());

        // The directory is also removed on drop if this future is cancelled
        let result = self.process(&ffmpeg, work_dir.path()).await;

        if let Err(e) = work_dir.close() {
            self.logger
                .log_warning(&format!("Failed to remove working directory: {}", e));
        }

        result
    }

    async fn process(&self, ffmpeg: &Path, work_dir: &Path) -> SessionResult<MergeOutcome> {
        let config = &self.ctx.config;

        self.send(OutboundMessage::status("Downloading TS segments..."));
        let sink = OutboxProgress {
            outbox: &self.outbox,
        };
        let report = self
            .ctx
            .downloader
            .download_all(&self.request.segments, work_dir, &sink)
            .await;

        if report.retrieved_count() == 0 {
            return Err(SessionError::NoSegmentsRetrieved {
                failed: report.failed_count(),
            });
        }
        if report.failed_count() > 0 {
            self.logger.log_warning(&format!(
                "{} of {} segments failed to download",
                report.failed_count(),
                report.total()
            ));
        }

        self.enter(SessionPhase::BuildManifest);
        let list_path = work_dir.join(CONCAT_LIST_NAME);
        let entries = write_concat_list(work_dir, &list_path).await?;
        if entries == 0 {
            return Err(SessionError::EmptyManifest);
        }

        self.enter(SessionPhase::ResolveOutput);
        tokio::fs::create_dir_all(&config.output_dir).await?;
        let output_path = self.resolve_output();
        debug!("Output path: {}", output_path.display());

        self.enter(SessionPhase::Merge);
        self.send(OutboundMessage::status(format!(
            "Merging with FFmpeg... ({} segments)",
            entries
        )));
        let staged = work_dir.join(format!("merged.{}", DEFAULT_EXTENSION));
        let command = FfmpegCommand::concat(&list_path, &staged);
        let output = self.ctx.runner.run_captured(ffmpeg, &command).await?;

        self.enter(SessionPhase::Finalize);
        if !output.success {
            return Err(SessionError::ffmpeg_failed(output.exit_code, &output.stderr));
        }

        let output_path = self.place_output(&staged, output_path).await?;
        let size = tokio::fs::metadata(&output_path).await?.len();

        Ok(MergeOutcome::completed(
            output_path.to_string_lossy(),
            report.retrieved_count(),
            report.failed_count(),
            report.total(),
            size,
        ))
    }

    fn resolve_output(&self) -> PathBuf {
        let quality = self.request.quality_label();
        resolve_output_path(
            &self.ctx.config.output_dir,
            &self.request.file_stem(),
            quality.as_deref(),
            DEFAULT_EXTENSION,
        )
    }

    /// Move the merged file to `candidate`, or to the next free name if
    /// another writer took `candidate` while FFmpeg was running.
    async fn place_output(&self, staged: &Path, mut candidate: PathBuf) -> SessionResult<PathBuf> {
        loop {
            match move_into_place(staged, &candidate).await {
                Ok(()) => return Ok(candidate),
                Err(MediaError::DestinationExists(taken)) => {
                    debug!("{} was taken during the merge, resolving again", taken.display());
                    candidate = self.resolve_output();
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn enter(&self, phase: SessionPhase) {
        self.logger.log_phase(phase.as_str());
    }

    fn send(&self, message: OutboundMessage) {
        if self.outbox.send(message).is_err() {
            debug!(session_id = %self.id, "Outbox closed, dropping message");
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
