//! Native messaging host for merging HLS segments.
//!
//! This crate provides:
//! - Length-prefixed JSON framing over stdio
//! - A single serialized writer shared by all sessions
//! - Merge sessions (download, concat list, FFmpeg, result)
//! - The request dispatcher loop

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod session;

pub use channel::{spawn_writer, ChannelError, FrameReader, FrameWriter, Outbox};
pub use config::HostConfig;
pub use dispatcher::Dispatcher;
pub use error::{HostError, HostResult, SessionError, SessionResult};
pub use logging::SessionLogger;
pub use session::{MergeSession, SessionContext, SessionPhase};
