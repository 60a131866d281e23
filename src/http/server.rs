//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile the registry into routes and an axum Router
//! - Wire up middleware (request id, tracing, timeout, panic boundary)
//! - Bind server to listener with graceful shutdown
//! - Sweep expired sessions in the background

use axum::http::StatusCode;
use axum::middleware::map_response;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::http::response;
use crate::lifecycle::{signalled, Shutdown};
use crate::observability::metrics;
use crate::provider::Provider;
use crate::registry::Registry;
use crate::routing::{Registrar, RouteTable};
use crate::session::{MemorySessionStore, SessionStore};

/// HTTP server serving the routes of one registry.
pub struct HttpServer {
    router: Router,
    config: CoreConfig,
    routes: RouteTable,
    tokens: Arc<TokenService>,
}

impl HttpServer {
    /// Compile `registry` into routes. Fails on an invalid route table or a
    /// controller that cannot be constructed.
    pub fn new(
        config: CoreConfig,
        registry: Registry,
        provider: Provider,
        store: Arc<dyn SessionStore>,
    ) -> CoreResult<Self> {
        let tokens = Arc::new(TokenService::from_config(&config.auth, store));
        let routes = Registrar::new(registry, provider, tokens.clone()).build()?;
        tracing::info!(routes = routes.len(), "Route table compiled");

        let router = Self::build_router(&config, &routes);
        Ok(Self {
            router,
            config,
            routes,
            tokens,
        })
    }

    /// Same as [`HttpServer::new`] with an in-memory session store using `session.ttl_secs`.
    pub fn with_memory_store(
        config: CoreConfig,
        registry: Registry,
        provider: Provider,
    ) -> CoreResult<Self> {
        let store = MemorySessionStore::new(Duration::from_secs(config.session.ttl_secs));
        Self::new(config, registry, provider, Arc::new(store))
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &CoreConfig, routes: &RouteTable) -> Router {
        routes
            .install(config.limits.max_body_size)
            .fallback(response::not_found)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(map_response(response::envelope_timeout))
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        Duration::from_secs(config.timeouts.request_secs),
                    ))
                    .layer(CatchPanicLayer::custom(response::panic_response)),
            )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = spawn_sweeper(
            self.tokens.store().clone(),
            Duration::from_secs(self.config.session.sweep_interval_secs),
            shutdown.subscribe(),
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signalled(shutdown.subscribe()))
            .await?;

        shutdown.trigger();
        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "Session sweeper did not exit cleanly");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Periodically remove expired sessions until shutdown.
pub fn spawn_sweeper(
    store: Arc<dyn SessionStore>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => match store.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => {
                        tracing::debug!(purged, "Expired sessions removed");
                        metrics::record_sessions_purged(purged);
                    }
                    Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
                },
            }
        }
        tracing::debug!("Session sweeper stopped");
    })
}
