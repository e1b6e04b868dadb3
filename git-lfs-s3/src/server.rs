use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use log::info;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::handler::BatchHandler;

/// Serves `handler` on `addr` until `shutdown` resolves.
///
/// `on_bound` is told the actual address, which differs from `addr` when
/// binding port 0.
pub async fn serve(
    addr: SocketAddr,
    handler: Arc<BatchHandler>,
    on_bound: impl FnOnce(SocketAddr),
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let make_svc = make_service_fn(move |_conn| {
        let handler = handler.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |request| {
                let handler = handler.clone();
                async move { Ok::<_, Infallible>(handler.handle(request).await) }
            }))
        }
    });

    let server = Server::try_bind(&addr)
        .with_context(|| format!("could not bind {}", addr))?
        .serve(make_svc);
    let local_addr = server.local_addr();
    info!("listening on {}", local_addr);
    on_bound(local_addr);

    server
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;
    info!("shut down");
    Ok(())
}

pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("could not listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
}
