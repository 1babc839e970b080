//! Native messaging host binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use tsmerge_host::logging::init_tracing;
use tsmerge_host::{spawn_writer, Dispatcher, FrameReader, FrameWriter, HostConfig, SessionContext};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for HTTPS segment URLs)
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    if let Err(e) = run().await {
        error!("Host stopped: {:#}", e);
        std::process::exit(1);
    }

    info!("Host shutdown complete");
}

async fn run() -> anyhow::Result<()> {
    let config = HostConfig::from_env();
    info!("Host config: {:?}", config);

    let reader = FrameReader::new(tokio::io::stdin()).with_max_frame_bytes(config.max_frame_bytes);
    let ctx = Arc::new(SessionContext::from_config(config).context("failed to initialize host")?);

    let (outbox, writer_task) = spawn_writer(FrameWriter::new(tokio::io::stdout()));
    let result = Dispatcher::new(reader, outbox, ctx).run().await;

    // The dispatcher owned the last outbox; wait for queued frames to be written
    writer_task.await.context("writer task failed")?;

    result.context("dispatcher failed")
}
