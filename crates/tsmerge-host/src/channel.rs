//! Length-prefixed JSON framing over stdio.
//!
//! Each frame is a 4-byte little-endian length followed by that many bytes of
//! UTF-8 JSON. Reads and writes are symmetric, so the same types serve both
//! the host and test peers.
//!
//! Every outbound message goes through an [`Outbox`] to one writer task that
//! owns the [`FrameWriter`]. The writer additionally holds a lock across each
//! full frame, so a length prefix is never separated from its body.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use tsmerge_models::OutboundMessage;

/// Size of the length prefix.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Default upper bound for inbound frames.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Framing and transport errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream ended inside a frame ({read} of {expected} bytes)")]
    TruncatedFrame { read: usize, expected: usize },

    #[error("Frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Malformed message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Outbound channel closed")]
    Closed,
}

/// Encode `message` as one frame: length prefix followed by JSON.
pub fn encode_frame<T: Serialize>(message: &T) -> ChannelResult<Vec<u8>> {
    let body = serde_json::to_vec(message).map_err(ChannelError::Encode)?;
    let len = u32::try_from(body.len()).map_err(|_| ChannelError::FrameTooLarge {
        len: body.len(),
        max: u32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_BYTES + body.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Reads frames from a byte stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    /// Reject frames longer than `max` bytes.
    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }

    /// Read the next frame as JSON.
    ///
    /// Returns `Ok(None)` when the peer closed the stream on a frame
    /// boundary. A stream that ends mid-frame, or a body that is not JSON,
    /// is an error.
    pub async fn receive(&mut self) -> ChannelResult<Option<serde_json::Value>> {
        let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
        match self.read_full(&mut prefix).await? {
            0 => return Ok(None),
            LENGTH_PREFIX_BYTES => {}
            read => {
                return Err(ChannelError::TruncatedFrame {
                    read,
                    expected: LENGTH_PREFIX_BYTES,
                })
            }
        }

        let len = u32::from_le_bytes(prefix) as usize;
        if len > self.max_frame_bytes {
            return Err(ChannelError::FrameTooLarge {
                len,
                max: self.max_frame_bytes,
            });
        }

        let mut body = vec![0u8; len];
        let read = self.read_full(&mut body).await?;
        if read < len {
            return Err(ChannelError::TruncatedFrame {
                read,
                expected: len,
            });
        }

        let value = serde_json::from_slice(&body).map_err(ChannelError::Malformed)?;
        Ok(Some(value))
    }

    /// Read the next frame and decode it as `T`.
    pub async fn receive_as<T: DeserializeOwned>(&mut self) -> ChannelResult<Option<T>> {
        match self.receive().await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(ChannelError::Malformed),
            None => Ok(None),
        }
    }

    /// Fill `buf` until it is full or the stream ends; returns bytes read.
    async fn read_full(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

/// Writes frames to a byte stream, one whole frame at a time.
#[derive(Debug)]
pub struct FrameWriter<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Write one frame and flush it.
    pub async fn send<T: Serialize>(&self, message: &T) -> ChannelResult<()> {
        let frame = encode_frame(message)?;

        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Cloneable handle for queueing outbound messages.
///
/// Messages sent through one handle are written in the order they were sent.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Outbox {
    /// Create an outbox and the receiving end a writer drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a message for the writer.
    pub fn send(&self, message: OutboundMessage) -> ChannelResult<()> {
        self.tx.send(message).map_err(|_| ChannelError::Closed)
    }
}

/// Start the writer task for `writer`.
///
/// The task runs until every [`Outbox`] clone is dropped, or stops at the
/// first failed write (the peer has gone away).
pub fn spawn_writer<W>(writer: FrameWriter<W>) -> (Outbox, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbox, mut rx) = Outbox::channel();

    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let kind = message.message_type().as_str();
            if let Err(e) = writer.send(&message).await {
                error!(kind, "Failed to write outbound message: {}", e);
                break;
            }
            debug!(kind, "Sent message");
        }
    });

    (outbox, handle)
}
