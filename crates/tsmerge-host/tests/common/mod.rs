//! Shared fixtures: temp directories, a stand-in FFmpeg, a segment server.
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tsmerge_host::{HostConfig, SessionContext};
use tsmerge_models::OutboundMessage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct Harness {
    root: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("out")).unwrap();
        std::fs::create_dir(root.path().join("work")).unwrap();
        Self { root }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("out")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    /// Appended to on every FFmpeg invocation.
    pub fn invocations(&self) -> PathBuf {
        self.root.path().join("invocations")
    }

    /// Copy of the concat list from the last merge.
    pub fn last_list(&self) -> PathBuf {
        self.root.path().join("last_list.txt")
    }

    pub fn ffmpeg_was_invoked(&self) -> bool {
        self.invocations().exists()
    }

    /// Entries left in the work root; sessions must clean up after themselves.
    pub fn leftover_work_entries(&self) -> usize {
        std::fs::read_dir(self.work_dir()).unwrap().count()
    }

    /// FFmpeg stand-in that concatenates the files named in the concat list.
    pub fn concat_ffmpeg(&self) -> PathBuf {
        self.concat_script("ffmpeg-concat", "")
    }

    /// Like [`Harness::concat_ffmpeg`], but sleeps before merging.
    pub fn slow_concat_ffmpeg(&self, delay: &str) -> PathBuf {
        self.concat_script("ffmpeg-slow", &format!("sleep {}", delay))
    }

    fn concat_script(&self, name: &str, prelude: &str) -> PathBuf {
        let body = format!(
            r#"echo invoked >> '{invocations}'
{prelude}
list=""
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -i) list="$2"; shift 2 ;;
    *) out="$1"; shift ;;
  esac
done
cp "$list" '{last_list}'
: > "$out"
sed -n "s/^file '\(.*\)'\$/\1/p" "$list" | while IFS= read -r f; do cat "$f" >> "$out"; done"#,
            invocations = self.invocations().display(),
            prelude = prelude,
            last_list = self.last_list().display(),
        );
        self.write_script(name, &body)
    }

    /// FFmpeg stand-in that fails with a long diagnostic.
    pub fn failing_ffmpeg(&self) -> PathBuf {
        let body = format!(
            r#"echo invoked >> '{invocations}'
i=0
while [ $i -lt 50 ]; do
  echo "error line $i: Invalid data found when processing input" >&2
  i=$((i+1))
done
exit 1"#,
            invocations = self.invocations().display(),
        );
        self.write_script("ffmpeg-fail", &body)
    }

    pub fn config(&self, ffmpeg: PathBuf) -> HostConfig {
        HostConfig {
            ffmpeg_path: Some(ffmpeg),
            output_dir: self.output_dir(),
            work_dir: self.work_dir(),
            fetch_connect_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(10),
            ..HostConfig::default()
        }
    }

    pub fn context(&self, ffmpeg: PathBuf) -> Arc<SessionContext> {
        Self::context_with(self.config(ffmpeg))
    }

    pub fn context_with(config: HostConfig) -> Arc<SessionContext> {
        Arc::new(SessionContext::from_config(config).unwrap())
    }

    /// A regular file, for use where a directory is expected.
    pub fn plain_file(&self) -> PathBuf {
        let path = self.root.path().join("not-a-directory");
        std::fs::write(&path, b"").unwrap();
        path
    }

    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.output_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn write_script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

/// Serves `/seg{i}.ts` with the given bodies; indexes in `failing` return 404.
pub async fn segment_server(bodies: &[&str], failing: &[usize]) -> (MockServer, Vec<String>) {
    segment_server_with_delay(bodies, failing, Duration::ZERO).await
}

pub async fn segment_server_with_delay(
    bodies: &[&str],
    failing: &[usize],
    delay: Duration,
) -> (MockServer, Vec<String>) {
    let server = MockServer::start().await;
    let mut urls = Vec::with_capacity(bodies.len());

    for (i, body) in bodies.iter().enumerate() {
        let route = format!("/seg{}.ts", i);
        if !failing.contains(&i) {
            Mock::given(method("GET"))
                .and(path(route.as_str()))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_bytes(body.as_bytes().to_vec())
                        .set_delay(delay),
                )
                .mount(&server)
                .await;
        }
        urls.push(format!("{}{}", server.uri(), route));
    }

    (server, urls)
}

/// Everything queued on an outbox whose senders have all been dropped.
pub async fn collect(mut rx: mpsc::UnboundedReceiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }
    messages
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
