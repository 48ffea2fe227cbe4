use crate::server::routes;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Uploads larger than this are rejected before decode
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Build the Axum application
pub fn build_app(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health
        .route("/health", get(routes::health))
        // Configuration
        .route("/config", get(routes::get_config))
        // Classification
        .route("/classify", post(routes::classify))
        // Records
        .route("/records", get(routes::list_records))
        .route("/records/:id", get(routes::get_record))
        .route("/records/:id/export", get(routes::export_record));

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Some(handle) = metrics_handle {
        app = app.route("/metrics", get(move || std::future::ready(handle.render())));
    }

    app
}

/// Run the server until shutdown is signalled
pub async fn run_server(
    state: AppState,
    metrics_handle: Option<PrometheusHandle>,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_app(state, metrics_handle);

    tracing::info!("Starting BreedLens server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
