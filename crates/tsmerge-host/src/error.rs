//! Host and session error types.

use thiserror::Error;
use tsmerge_media::MediaError;

use crate::channel::ChannelError;

/// Maximum number of FFmpeg stderr characters echoed back to the extension.
pub const FFMPEG_ERROR_EXCERPT_CHARS: usize = 200;

pub type SessionResult<T> = Result<T, SessionError>;

/// Failures of a single merge session.
///
/// All of these end the session with a failed `result`; none of them stop
/// the host.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Segment list is empty")]
    EmptySegmentList,

    #[error("FFmpeg not found. Put ffmpeg next to the host executable, set TSMERGE_FFMPEG_PATH, or add it to PATH.")]
    FfmpegUnavailable,

    #[error("No segments could be downloaded ({failed} failed)")]
    NoSegmentsRetrieved { failed: usize },

    #[error("Concat list is empty")]
    EmptyManifest,

    #[error("FFmpeg error: {excerpt}...")]
    FfmpegFailed {
        exit_code: Option<i32>,
        excerpt: String,
    },

    #[error("Processing error: {0}")]
    Media(#[from] MediaError),

    #[error("Processing error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing error: session panicked: {0}")]
    Panicked(String),
}

impl SessionError {
    /// Create an FFmpeg failure from its stderr, keeping only a short prefix.
    pub fn ffmpeg_failed(exit_code: Option<i32>, stderr: &str) -> Self {
        Self::FfmpegFailed {
            exit_code,
            excerpt: stderr.chars().take(FFMPEG_ERROR_EXCERPT_CHARS).collect(),
        }
    }

    /// Error kind for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::EmptySegmentList => "validation",
            SessionError::FfmpegUnavailable => "tool_unavailable",
            SessionError::NoSegmentsRetrieved { .. } | SessionError::EmptyManifest => {
                "empty_manifest"
            }
            SessionError::FfmpegFailed { .. } => "tool_execution",
            SessionError::Media(_) | SessionError::Io(_) | SessionError::Panicked(_) => {
                "unexpected"
            }
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// Failures of the host itself. These end the dispatcher loop.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Startup failed: {0}")]
    Startup(#[from] MediaError),
}
