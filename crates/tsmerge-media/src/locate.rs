//! FFmpeg discovery.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds the FFmpeg executable.
///
/// Lookup order: explicitly configured path, `ffmpeg` in the search
/// directories (by default the directory holding the host executable), then
/// `PATH`. A configured path that does not exist means "not found"; it does
/// not fall through to the other locations.
#[derive(Debug, Clone)]
pub struct FfmpegLocator {
    explicit: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
    search_path: bool,
}

impl Default for FfmpegLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegLocator {
    /// Search next to the running executable, then `PATH`.
    pub fn new() -> Self {
        let search_dirs = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .into_iter()
            .collect();

        Self {
            explicit: None,
            search_dirs,
            search_path: true,
        }
    }

    /// Use exactly this executable.
    pub fn with_explicit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Locate FFmpeg, returning `None` when it is not installed.
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(explicit) = &self.explicit {
            return explicit.is_file().then(|| explicit.clone());
        }

        let binary = executable_name();
        if let Some(found) = self
            .search_dirs
            .iter()
            .map(|dir| dir.join(&binary))
            .find(|candidate| candidate.is_file())
        {
            debug!("Found FFmpeg next to host: {}", found.display());
            return Some(found);
        }

        if self.search_path {
            if let Ok(found) = which::which("ffmpeg") {
                debug!("Found FFmpeg on PATH: {}", found.display());
                return Some(found);
            }
        }

        None
    }
}

fn executable_name() -> String {
    format!("ffmpeg{}", std::env::consts::EXE_SUFFIX)
}
