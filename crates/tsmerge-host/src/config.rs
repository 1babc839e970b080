//! Host configuration.

use std::path::PathBuf;
use std::time::Duration;

use tsmerge_media::FetchSettings;

use crate::channel::DEFAULT_MAX_FRAME_BYTES;

/// Host configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Explicit FFmpeg executable; skips discovery when set
    pub ffmpeg_path: Option<PathBuf>,
    /// Directory merged files are written to
    pub output_dir: PathBuf,
    /// Parent of the per-session working directories
    pub work_dir: PathBuf,
    /// HTTP connect timeout for fragment fetches
    pub fetch_connect_timeout: Duration,
    /// Whole-request timeout per fragment (`None` = no limit)
    pub fetch_timeout: Option<Duration>,
    /// FFmpeg process timeout (`None` = no limit)
    pub ffmpeg_timeout: Option<Duration>,
    /// Largest inbound frame accepted
    pub max_frame_bytes: usize,
    /// How long in-flight sessions may run after stdin closes
    pub shutdown_timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            output_dir: default_output_dir(),
            work_dir: std::env::temp_dir(),
            fetch_connect_timeout: Duration::from_secs(10),
            fetch_timeout: None,
            ffmpeg_timeout: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl HostConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ffmpeg_path: std::env::var_os("TSMERGE_FFMPEG_PATH")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            output_dir: std::env::var_os("TSMERGE_OUTPUT_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            work_dir: std::env::var_os("TSMERGE_WORK_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            fetch_connect_timeout: Duration::from_secs(
                std::env::var("TSMERGE_FETCH_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            fetch_timeout: optional_secs("TSMERGE_FETCH_TIMEOUT_SECS"),
            ffmpeg_timeout: optional_secs("TSMERGE_FFMPEG_TIMEOUT_SECS"),
            max_frame_bytes: std::env::var("TSMERGE_MAX_FRAME_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_FRAME_BYTES),
            shutdown_timeout: Duration::from_secs(
                std::env::var("TSMERGE_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// HTTP settings for the fragment downloader.
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: self.fetch_connect_timeout,
            request_timeout: self.fetch_timeout,
            ..FetchSettings::default()
        }
    }
}

/// Seconds from `var`; unset, unparsable or 0 means no timeout.
fn optional_secs(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// The user's Downloads folder, or the current directory when no home is known.
pub fn default_output_dir() -> PathBuf {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .find(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("."))
}
