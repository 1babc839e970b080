#![deny(unreachable_patterns)]
//! Segment retrieval and FFmpeg merging for the tsmerge host.
//!
//! This crate provides:
//! - Ordered fragment download with per-fragment failure tolerance
//! - FFmpeg concat list construction
//! - Collision-free output path resolution
//! - FFmpeg discovery, command building and captured execution

pub mod command;
pub mod concat;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod locate;
pub mod output;

pub use command::{FfmpegCommand, FfmpegOutput, FfmpegRunner};
pub use concat::{concat_line, write_concat_list, CONCAT_LIST_NAME};
pub use download::{
    DownloadReport, FetchSettings, FragmentDownloader, FragmentProgress, ProgressSink,
};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_into_place;
pub use locate::FfmpegLocator;
pub use output::{output_base_name, resolve_output_path, DEFAULT_EXTENSION};
