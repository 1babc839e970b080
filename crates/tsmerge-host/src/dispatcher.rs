//! Request dispatcher: the host's main loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use tsmerge_models::{InboundMessage, MergeOutcome, MergeRequest, OutboundMessage};

use crate::channel::{FrameReader, Outbox};
use crate::error::HostResult;
use crate::session::{MergeSession, SessionContext};

/// Payload of the `ready` message sent at startup.
pub const READY_MESSAGE: &str = "FFmpeg native host ready";

/// Reads requests and starts one session task per merge request.
///
/// `check_ffmpeg` is answered in-line, before the next request is read.
/// Errors of the loop itself (unreadable or malformed frames) are reported
/// once with an `error` message and end the loop; session failures never do.
pub struct Dispatcher<R> {
    reader: FrameReader<R>,
    outbox: Outbox,
    ctx: Arc<SessionContext>,
    sessions: JoinSet<MergeOutcome>,
    shutdown_timeout: Duration,
}

impl<R: AsyncRead + Unpin> Dispatcher<R> {
    pub fn new(reader: FrameReader<R>, outbox: Outbox, ctx: Arc<SessionContext>) -> Self {
        let shutdown_timeout = ctx.config.shutdown_timeout;
        Self {
            reader,
            outbox,
            ctx,
            sessions: JoinSet::new(),
            shutdown_timeout,
        }
    }

    /// Run until stdin closes (`Ok`) or the loop hits a fault (`Err`).
    pub async fn run(mut self) -> HostResult<()> {
        self.outbox.send(OutboundMessage::ready(READY_MESSAGE))?;
        info!("Host ready, waiting for requests");

        match self.read_loop().await {
            Ok(()) => {
                self.drain_sessions().await;
                Ok(())
            }
            Err(e) => {
                error!("Dispatcher failed: {}", e);
                if self.outbox.send(OutboundMessage::error(e.to_string())).is_err() {
                    warn!("Could not report dispatcher failure, outbox closed");
                }
                self.sessions.shutdown().await;
                Err(e)
            }
        }
    }

    async fn read_loop(&mut self) -> HostResult<()> {
        loop {
            self.reap_finished();

            let Some(value) = self.reader.receive().await? else {
                info!("Input closed");
                return Ok(());
            };

            let message = match serde_json::from_value::<InboundMessage>(value) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Ignoring message that matches no request shape: {}", e);
                    continue;
                }
            };

            self.dispatch(message)?;
        }
    }

    fn dispatch(&mut self, message: InboundMessage) -> HostResult<()> {
        debug!(kind = message.kind(), "Received message");

        match message {
            InboundMessage::MergeSegments { data } => self.start_session(data),
            InboundMessage::CheckFfmpeg => {
                let path = self.ctx.locator.locate();
                info!(available = path.is_some(), "Answering check_ffmpeg");
                self.outbox.send(OutboundMessage::ffmpeg_status(
                    path.map(|p| p.to_string_lossy().into_owned()),
                ))?;
            }
            InboundMessage::Unknown => {
                debug!("Ignoring unknown message type");
            }
        }

        Ok(())
    }

    fn start_session(&mut self, request: MergeRequest) {
        let session = MergeSession::new(request, Arc::clone(&self.ctx), self.outbox.clone());
        info!(
            session_id = %session.id(),
            in_flight = self.sessions.len() + 1,
            "Starting merge session"
        );
        self.sessions.spawn(session.run());
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.sessions.try_join_next() {
            log_join_failure(joined);
        }
    }

    /// Let in-flight sessions finish within the shutdown timeout, then abort the rest.
    async fn drain_sessions(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        info!(
            in_flight = self.sessions.len(),
            "Waiting for in-flight sessions to complete..."
        );

        let sessions = &mut self.sessions;
        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while let Some(joined) = sessions.join_next().await {
                log_join_failure(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = self.sessions.len(),
                "Shutdown timeout reached, aborting sessions"
            );
            self.sessions.shutdown().await;
        }
    }
}

fn log_join_failure(joined: Result<MergeOutcome, JoinError>) {
    if let Err(e) = joined {
        // Sessions catch their own panics, so this is an abort
        warn!("Session task ended abnormally: {}", e);
    }
}
