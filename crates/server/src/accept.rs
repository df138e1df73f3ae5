//! TCP accept loop (§4.8, ambient orchestration): one task per connection,
//! handed straight to `net::dispatch`. Errors from a single connection
//! never bring down the listener.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::registry::Registry;

pub async fn serve(bind_addr: &str, registry: Arc<Registry>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(bind_addr, "listening");

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let directory: Arc<dyn net::CapsuleDirectory> = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = net::dispatch(stream, directory).await {
                if e.is_storage_corruption() {
                    tracing::error!(%peer_addr, error = %e, "datacapsule storage corruption detected, aborting");
                    std::process::abort();
                }
                tracing::warn!(%peer_addr, error = %e, "connection ended with an error");
            }
        });
    }
}
