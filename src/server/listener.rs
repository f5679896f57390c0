use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionError};
use crate::http::handler::Handler;

/// Binds `cfg.listen_addr` and serves until the listener fails.
pub async fn run<H: Handler>(cfg: &Config, handler: Arc<H>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("Listening on {} ({} sessions)", cfg.listen_addr, cfg.mode);

    serve(listener, cfg, handler).await
}

/// Accepts connections forever, one session task each.
///
/// Session failures stay inside their task. An accept failure is returned,
/// since a broken listener cannot be recovered here.
pub async fn serve<H: Handler>(
    listener: TcpListener,
    cfg: &Config,
    handler: Arc<H>,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        debug!("Accepted connection from {}", peer);

        let conn = Connection::new(socket, peer.to_string())
            .read_timeout(cfg.read_timeout)
            .pipeline_depth(cfg.pipeline_depth);
        let mode = cfg.mode;
        let handler = Arc::clone(&handler);

        tokio::spawn(async move {
            match conn.run(mode, handler).await {
                Ok(()) => {}
                Err(ConnectionError::Write(e)) => {
                    debug!("Write to {} failed: {}", peer, e);
                }
                Err(e) => {
                    warn!("Connection error from {}: {}", peer, e);
                }
            }
        });
    }
}
