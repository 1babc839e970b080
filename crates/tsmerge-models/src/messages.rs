//! Native messaging message types.
//!
//! These messages keep the JSON shape the browser extension already speaks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::outcome::MergeOutcome;
use crate::request::MergeRequest;

/// Requests sent by the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Download and merge a list of segments
    MergeSegments {
        #[serde(default)]
        data: MergeRequest,
    },

    /// Report whether FFmpeg is available
    CheckFfmpeg,

    /// Any tag this host does not understand
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Tag name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::MergeSegments { .. } => "merge_segments",
            InboundMessage::CheckFfmpeg => "check_ffmpeg",
            InboundMessage::Unknown => "unknown",
        }
    }
}

/// Outbound message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutboundMessageType {
    Ready,
    Status,
    Progress,
    Result,
    FfmpegStatus,
    Error,
}

impl OutboundMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundMessageType::Ready => "ready",
            OutboundMessageType::Status => "status",
            OutboundMessageType::Progress => "progress",
            OutboundMessageType::Result => "result",
            OutboundMessageType::FfmpegStatus => "ffmpeg_status",
            OutboundMessageType::Error => "error",
        }
    }
}

/// Events sent to the extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Host started and is reading requests
    Ready { message: String },

    /// Phase change within a merge session
    Status { message: String },

    /// Per-fragment download progress
    Progress {
        /// 1-based position of the fragment just attempted
        current: usize,
        total: usize,
        status: String,
        /// 0-100
        percentage: f64,
    },

    /// Final outcome of a merge session
    Result { data: MergeOutcome },

    /// Answer to `check_ffmpeg`
    FfmpegStatus {
        available: bool,
        path: Option<String>,
    },

    /// Host-level failure; the host stops after sending it
    Error { message: String },
}

impl OutboundMessage {
    /// Create a ready message.
    pub fn ready(message: impl Into<String>) -> Self {
        OutboundMessage::Ready {
            message: message.into(),
        }
    }

    /// Create a status message.
    pub fn status(message: impl Into<String>) -> Self {
        OutboundMessage::Status {
            message: message.into(),
        }
    }

    /// Create a progress message; percentage is derived from `current / total`.
    pub fn progress(current: usize, total: usize, status: impl Into<String>) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (current as f64 / total as f64) * 100.0
        };
        OutboundMessage::Progress {
            current,
            total,
            status: status.into(),
            percentage,
        }
    }

    /// Create a result message.
    pub fn result(data: MergeOutcome) -> Self {
        OutboundMessage::Result { data }
    }

    /// Create an FFmpeg status message.
    pub fn ffmpeg_status(path: Option<String>) -> Self {
        OutboundMessage::FfmpegStatus {
            available: path.is_some(),
            path,
        }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        OutboundMessage::Error {
            message: message.into(),
        }
    }

    pub fn message_type(&self) -> OutboundMessageType {
        match self {
            OutboundMessage::Ready { .. } => OutboundMessageType::Ready,
            OutboundMessage::Status { .. } => OutboundMessageType::Status,
            OutboundMessage::Progress { .. } => OutboundMessageType::Progress,
            OutboundMessage::Result { .. } => OutboundMessageType::Result,
            OutboundMessage::FfmpegStatus { .. } => OutboundMessageType::FfmpegStatus,
            OutboundMessage::Error { .. } => OutboundMessageType::Error,
        }
    }
}
