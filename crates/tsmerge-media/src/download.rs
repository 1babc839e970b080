//! Ordered fragment download.
//!
//! Every URL gets exactly one attempt, in request order. A failed fragment is
//! counted and skipped; it never aborts the batch and never leaves a partial
//! file behind, so whatever is on disk afterwards is complete.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use tsmerge_models::{fragment_file_name, fragment_index_width, Fragment};

use crate::error::{MediaError, MediaResult};

/// HTTP settings for fragment fetches.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Whole-request timeout per fragment. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agent: concat!("tsmerge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Progress after one fragment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentProgress {
    /// 1-based position of the fragment just attempted
    pub current: usize,
    pub total: usize,
    /// Human-readable status line
    pub status: String,
}

/// Receives one [`FragmentProgress`] per attempted fragment.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: FragmentProgress);
}

/// Result of a download batch.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// One entry per requested URL, in request order
    pub fragments: Vec<Fragment>,
}

impl DownloadReport {
    /// Fragments that were written to disk, in index order.
    pub fn retrieved(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(|f| f.retrieved)
    }

    pub fn retrieved_count(&self) -> usize {
        self.retrieved().count()
    }

    pub fn failed_count(&self) -> usize {
        self.total() - self.retrieved_count()
    }

    pub fn total(&self) -> usize {
        self.fragments.len()
    }
}

/// Downloads fragments over HTTP.
#[derive(Debug, Clone)]
pub struct FragmentDownloader {
    client: reqwest::Client,
}

impl FragmentDownloader {
    /// Build a downloader with its own HTTP client.
    pub fn new(settings: &FetchSettings) -> MediaResult<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.clone());
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Fetch every URL into `dest_dir`, in order.
    pub async fn download_all(
        &self,
        urls: &[String],
        dest_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> DownloadReport {
        let total = urls.len();
        let width = fragment_index_width(total);
        let mut fragments = Vec::with_capacity(total);

        for (index, url) in urls.iter().enumerate() {
            let mut fragment = Fragment::pending(index, url.as_str());
            let file_name = fragment_file_name(index, width);
            let path = dest_dir.join(&file_name);

            let status = match self.fetch_to_file(url, &path).await {
                Ok(bytes) => {
                    debug!(index, bytes, url = %url, "Downloaded fragment");
                    fragment.mark_retrieved(&path);
                    format!("Downloaded: {}", file_name)
                }
                Err(e) => {
                    warn!(index, url = %url, "Fragment download failed: {}", e);
                    discard_partial(&path).await;
                    format!("Failed: {} - {}", file_name, e)
                }
            };

            fragments.push(fragment);
            sink.emit(FragmentProgress {
                current: index + 1,
                total,
                status,
            });
        }

        let report = DownloadReport { fragments };
        info!(
            total,
            retrieved = report.retrieved_count(),
            failed = report.failed_count(),
            "Fragment download finished"
        );
        report
    }

    /// Stream one URL into `path`, returning the number of bytes written.
    async fn fetch_to_file(&self, url: &str, path: &Path) -> MediaResult<u64> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial fragment {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial fragment {}: {}", path.display(), e),
    }
}
