//! Merge outcome reported in `result` messages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Final outcome of one merge session.
///
/// Successful outcomes carry the output file and fragment counts; failed
/// outcomes carry only a human-readable `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MergeOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments_downloaded: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments_failed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_segments: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MergeOutcome {
    /// Create a successful outcome. `file_size_bytes` is reported in MB, rounded to 2 decimals.
    pub fn completed(
        output_file: impl Into<String>,
        segments_downloaded: usize,
        segments_failed: usize,
        total_segments: usize,
        file_size_bytes: u64,
    ) -> Self {
        Self {
            success: true,
            output_file: Some(output_file.into()),
            segments_downloaded: Some(segments_downloaded),
            segments_failed: Some(segments_failed),
            total_segments: Some(total_segments),
            file_size_mb: Some(bytes_to_mb(file_size_bytes)),
            error: None,
        }
    }

    /// Create a failed outcome.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output_file: None,
            segments_downloaded: None,
            segments_failed: None,
            total_segments: None,
            file_size_mb: None,
            error: Some(error.into()),
        }
    }
}

fn bytes_to_mb(bytes: u64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}
