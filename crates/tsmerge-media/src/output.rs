//! Output path resolution.

use std::path::{Path, PathBuf};

/// Extension of merged output files.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Marker inserted between the base name and the collision counter.
const MERGED_SUFFIX: &str = "_merged";

/// `{filename}{_quality}_merged`, without extension or counter.
pub fn output_base_name(filename: &str, quality: Option<&str>) -> String {
    match quality {
        Some(quality) => format!("{}_{}{}", filename, quality, MERGED_SUFFIX),
        None => format!("{}{}", filename, MERGED_SUFFIX),
    }
}

/// First path in `dir` that does not exist yet.
///
/// Tries `{base}.{ext}`, then `{base}_1.{ext}`, `{base}_2.{ext}`, and so on.
/// The check is a snapshot; a concurrent writer can still take the path.
pub fn resolve_output_path(
    dir: &Path,
    filename: &str,
    quality: Option<&str>,
    extension: &str,
) -> PathBuf {
    let base = output_base_name(filename, quality);

    let mut candidate = dir.join(format!("{}.{}", base, extension));
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}.{}", base, counter, extension));
        counter += 1;
    }

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_base_name() {
        assert_eq!(output_base_name("clip", None), "clip_merged");
        assert_eq!(output_base_name("clip", Some("720p")), "clip_720p_merged");
    }

    #[test]
    fn test_no_collision() {
        let dir = TempDir::new().unwrap();
        let path = resolve_output_path(dir.path(), "clip", Some("1080p"), DEFAULT_EXTENSION);
        assert_eq!(path, dir.path().join("clip_1080p_merged.mp4"));
    }

    #[test]
    fn test_single_collision() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip_merged.mp4"), b"old").unwrap();

        let path = resolve_output_path(dir.path(), "clip", None, DEFAULT_EXTENSION);
        assert_eq!(path, dir.path().join("clip_merged_1.mp4"));
        assert!(!path.exists());
    }

    #[test]
    fn test_two_collisions_yield_suffix_two() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip_merged.mp4"), b"old").unwrap();
        std::fs::write(dir.path().join("clip_merged_1.mp4"), b"old").unwrap();

        let path = resolve_output_path(dir.path(), "clip", None, DEFAULT_EXTENSION);
        assert_eq!(path, dir.path().join("clip_merged_2.mp4"));
    }

    #[test]
    fn test_gap_in_suffixes_is_reused() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip_merged.mp4"), b"old").unwrap();
        std::fs::write(dir.path().join("clip_merged_2.mp4"), b"old").unwrap();

        let path = resolve_output_path(dir.path(), "clip", None, DEFAULT_EXTENSION);
        assert_eq!(path, dir.path().join("clip_merged_1.mp4"));
    }
}
