//! API router configuration.

use std::future::Future;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_event, api_info, complete_session, create_session, get_session, health, AppState,
};

/// Create the API router with all routes configured.
pub fn create_router() -> Router {
    create_router_with_state(AppState::new())
}

/// Create the API router with custom state.
pub fn create_router_with_state(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/", post(create_session))
        .route("/{session_id}", get(get_session))
        .route("/{session_id}/events", post(add_event))
        .route("/{session_id}/complete", post(complete_session));

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health))
        .nest("/sessions", session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Drain in-flight requests on Ctrl-C instead of exiting immediately.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            graceful_shutdown: true,
        }
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 3000)
    }
}

/// Start the API server with an in-memory store.
pub async fn serve(config: ServerConfig) -> crate::Result<()> {
    serve_with_state(config, AppState::new()).await
}

/// Start the API server with custom state.
pub async fn serve_with_state(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let router = create_router_with_state(state);

    tracing::info!("Starting convo-tracker API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if config.graceful_shutdown {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        axum::serve(listener, router).await?;
    }

    tracing::info!("convo-tracker API server stopped");
    Ok(())
}

fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown signal received, draining connections");
    }
}
