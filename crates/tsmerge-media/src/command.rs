//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Windows process creation flag that keeps FFmpeg from opening a console.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    /// Stream-copy merge of the files listed in a concat list.
    ///
    /// The argument set is fixed: concat demuxer, absolute paths allowed,
    /// no re-encode, negative timestamps shifted to zero.
    pub fn concat(list_path: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self::new(list_path, output)
            .input_format("concat")
            .unsafe_paths()
            .codec_copy()
            .avoid_negative_ts("make_zero")
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Force the input demuxer.
    pub fn input_format(self, format: impl Into<String>) -> Self {
        self.input_arg("-f").input_arg(format)
    }

    /// Allow absolute and otherwise "unsafe" paths in the concat list.
    pub fn unsafe_paths(self) -> Self {
        self.input_arg("-safe").input_arg("0")
    }

    /// Copy all streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set the negative timestamp handling mode.
    pub fn avoid_negative_ts(self, mode: impl Into<String>) -> Self {
        self.output_arg("-avoid_negative_ts").output_arg(mode)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.input_args.len() + self.output_args.len() + 3);

        args.extend(self.input_args.iter().cloned());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.iter().cloned());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Captured result of one FFmpeg run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegOutput {
    /// Exit code was zero
    pub success: bool,
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runner for FFmpeg commands that captures the full output.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Kill the process after this long. `None` waits indefinitely.
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    /// Create a new runner without a timeout.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `cmd` with the executable at `program` and wait for it to exit.
    ///
    /// A non-zero exit is not an error here; inspect [`FfmpegOutput::success`].
    pub async fn run_captured(&self, program: &Path, cmd: &FfmpegCommand) -> MediaResult<FfmpegOutput> {
        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", program.display(), args.join(" "));

        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let child = command.spawn()?;
        let wait = child.wait_with_output();

        let output = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, wait).await {
                Ok(result) => result?,
                Err(_) => {
                    // Dropping the future kills the child (kill_on_drop)
                    warn!("FFmpeg timed out after {:?}, killing process", timeout);
                    return Err(MediaError::timeout("FFmpeg", timeout));
                }
            },
            None => wait.await?,
        };

        let result = FfmpegOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(
            success = result.success,
            exit_code = ?result.exit_code,
            stderr_len = result.stderr.len(),
            "FFmpeg exited"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_args_are_fixed() {
        let cmd = FfmpegCommand::concat("/tmp/work/file_list.txt", "/home/u/Downloads/clip_merged.mp4");

        assert_eq!(
            cmd.build_args(),
            vec![
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "/tmp/work/file_list.txt",
                "-c",
                "copy",
                "-avoid_negative_ts",
                "make_zero",
                "/home/u/Downloads/clip_merged.mp4",
            ]
        );
    }
}
