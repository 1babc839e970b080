//! Wire data models for the tsmerge native messaging host.
//!
//! This crate provides Serde-serializable types for:
//! - Inbound requests and outbound events of the stdio protocol
//! - Merge requests and their outcomes
//! - Fragment records and fragment file naming

pub mod fragment;
pub mod messages;
pub mod outcome;
pub mod request;
pub mod session;

// Re-export common types
pub use fragment::{fragment_file_name, fragment_index_width, parse_fragment_index, Fragment};
pub use messages::{InboundMessage, OutboundMessage, OutboundMessageType};
pub use outcome::MergeOutcome;
pub use request::MergeRequest;
pub use session::SessionId;
