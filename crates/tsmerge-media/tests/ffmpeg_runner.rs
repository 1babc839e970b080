//! Runner tests against shell scripts standing in for FFmpeg.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tsmerge_media::{FfmpegCommand, FfmpegRunner, MediaError};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn captures_arguments_and_output() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "echo-args", r#"echo "$@"; echo "warn" >&2"#);

    let cmd = FfmpegCommand::concat("/w/file_list.txt", "/o/out.mp4");
    let output = FfmpegRunner::new().run_captured(&script, &cmd).await.unwrap();

    assert!(output.success);
    assert_eq!(output.exit_code, Some(0));
    assert_eq!(
        output.stdout.trim(),
        "-f concat -safe 0 -i /w/file_list.txt -c copy -avoid_negative_ts make_zero /o/out.mp4"
    );
    assert_eq!(output.stderr.trim(), "warn");
}

#[tokio::test]
async fn non_zero_exit_is_reported_not_raised() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "fail", r#"echo "Invalid data found" >&2; exit 3"#);

    let cmd = FfmpegCommand::concat("list.txt", "out.mp4");
    let output = FfmpegRunner::new().run_captured(&script, &cmd).await.unwrap();

    assert!(!output.success);
    assert_eq!(output.exit_code, Some(3));
    assert!(output.stderr.contains("Invalid data found"));
}

#[tokio::test]
async fn timeout_kills_hung_process() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "hang", "sleep 30");

    let cmd = FfmpegCommand::concat("list.txt", "out.mp4");
    let started = std::time::Instant::now();
    let result = FfmpegRunner::new()
        .with_timeout(Duration::from_millis(200))
        .run_captured(&script, &cmd)
        .await;

    assert!(matches!(result, Err(MediaError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn missing_executable_is_io_error() {
    let dir = TempDir::new().unwrap();
    let cmd = FfmpegCommand::concat("list.txt", "out.mp4");

    let result = FfmpegRunner::new()
        .run_captured(&dir.path().join("no-such-ffmpeg"), &cmd)
        .await;

    assert!(matches!(result, Err(MediaError::Io(_))));
}
