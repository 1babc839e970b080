//! Fragment records and fragment file naming.
//!
//! Fragment files are named `segment_<index>.ts`. The index is zero-padded to
//! at least four digits, and wider when the request holds more fragments, so
//! that a lexicographic listing matches request order. Consumers should still
//! order by [`parse_fragment_index`] rather than by name.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// File name prefix for downloaded fragments.
pub const FRAGMENT_PREFIX: &str = "segment_";

/// File extension for downloaded fragments.
pub const FRAGMENT_EXTENSION: &str = "ts";

/// Minimum zero-padding width of the fragment index.
pub const MIN_INDEX_WIDTH: usize = 4;

/// One fragment of a merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Fragment {
    /// Position in the original request (0-based). Sole ordering key.
    pub index: usize,
    /// URL the fragment was fetched from
    pub source_url: String,
    /// Local file, set once the fragment has been written to disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Whether the fragment was retrieved successfully
    pub retrieved: bool,
}

impl Fragment {
    /// Create a fragment that has not been retrieved yet.
    pub fn pending(index: usize, source_url: impl Into<String>) -> Self {
        Self {
            index,
            source_url: source_url.into(),
            local_path: None,
            retrieved: false,
        }
    }

    /// Mark the fragment as written to `path`.
    pub fn mark_retrieved(&mut self, path: impl Into<PathBuf>) {
        self.local_path = Some(path.into());
        self.retrieved = true;
    }
}

/// Padding width needed so every index of a `total`-sized request sorts correctly.
pub fn fragment_index_width(total: usize) -> usize {
    let max_index = total.saturating_sub(1);
    let digits = max_index.to_string().len();
    digits.max(MIN_INDEX_WIDTH)
}

/// File name for the fragment at `index`.
pub fn fragment_file_name(index: usize, width: usize) -> String {
    format!(
        "{}{:0width$}.{}",
        FRAGMENT_PREFIX,
        index,
        FRAGMENT_EXTENSION,
        width = width
    )
}

/// Parse the fragment index back out of a file name.
///
/// Returns `None` for names that are not fragment files.
pub fn parse_fragment_index(file_name: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(FRAGMENT_PREFIX)?
        .strip_suffix(FRAGMENT_EXTENSION)?
        .strip_suffix('.')?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
