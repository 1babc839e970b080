//! Merge request payload.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Base name used when the caller sends no usable filename.
pub const DEFAULT_FILENAME: &str = "video";

/// Quality labels the extension sends when it could not detect a quality.
const UNKNOWN_QUALITY_LABELS: &[&str] = &["unknown", "bilinmiyor"];

/// Payload of a `merge_segments` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MergeRequest {
    /// Fragment URLs in playback order
    #[serde(default)]
    pub segments: Vec<String>,
    /// Base name of the output file
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Quality label appended to the output name (e.g. "720p")
    #[serde(default)]
    pub quality: String,
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

impl Default for MergeRequest {
    fn default() -> Self {
        Self {
            segments: Vec::new(),
            filename: default_filename(),
            quality: String::new(),
        }
    }
}

impl MergeRequest {
    /// Create a request for the given segments.
    pub fn new(segments: Vec<String>, filename: impl Into<String>) -> Self {
        Self {
            segments,
            filename: filename.into(),
            quality: String::new(),
        }
    }

    /// Set the quality label.
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Filename made safe for use as a file stem.
    pub fn file_stem(&self) -> String {
        let stem = sanitize_file_component(&self.filename);
        if stem.is_empty() {
            DEFAULT_FILENAME.to_string()
        } else {
            stem
        }
    }

    /// Quality label to put in the output name, if any.
    pub fn quality_label(&self) -> Option<String> {
        let quality = self.quality.trim();
        if quality.is_empty()
            || UNKNOWN_QUALITY_LABELS
                .iter()
                .any(|label| quality.eq_ignore_ascii_case(label))
        {
            return None;
        }

        let label = sanitize_file_component(quality);
        (!label.is_empty()).then_some(label)
    }
}

/// Replace characters that are not valid in file names on common platforms.
fn sanitize_file_component(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    replaced
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string()
}
