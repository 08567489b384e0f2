//! HTTP server hosting the gateway API.

use crate::{api::create_router, gateway::StatusGateway};
use axum::Router;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Gateway HTTP server bound to one TCP address.
pub struct GatewayServer {
    gateway: Arc<StatusGateway>,
    listener: TcpListener,
    router: Router,
}

impl GatewayServer {
    /// Bind to `addr`. Port 0 picks a free port; see [`local_addr`](Self::local_addr).
    pub async fn bind(gateway: StatusGateway, addr: &str) -> io::Result<Self> {
        info!("Binding to TCP: {}", addr);
        let listener = TcpListener::bind(addr).await?;

        let gateway = Arc::new(gateway);
        let router = create_router(Arc::clone(&gateway));

        Ok(Self {
            gateway,
            listener,
            router,
        })
    }

    pub fn gateway(&self) -> &Arc<StatusGateway> {
        &self.gateway
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Server listening on {}", self.local_addr()?);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
