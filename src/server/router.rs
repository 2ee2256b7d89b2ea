use crate::server::api::{health_check, push_logs};
use crate::server::middleware::{log_requests, require_basic_auth};
use crate::server::IngestState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

/// Build the ingestion router: health check plus the authenticated push route.
pub fn build_router(state: Arc<IngestState>) -> Router {
    let push_routes = Router::new()
        .route("/loki/api/v1/push", post(push_logs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ));

    Router::new()
        .route("/healthz", get(health_check))
        .merge(push_routes)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(middleware::from_fn(log_requests))
        .layer(secure_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(secure_header(header::X_FRAME_OPTIONS, "SAMEORIGIN"))
        .layer(secure_header(header::REFERRER_POLICY, "no-referrer"))
        .layer(secure_header(
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=15552000; includeSubDomains",
        ))
        .layer(secure_header(header::X_XSS_PROTECTION, "0"))
        .with_state(state)
}

fn secure_header(
    name: header::HeaderName,
    value: &'static str,
) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}

/// Serve the router until `shutdown_rx` flips to `true`.
pub async fn start_server(
    listen_addr: SocketAddr,
    state: Arc<IngestState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let app = build_router(state);

    info!(addr = %listen_addr, "Starting ingestion HTTP server");

    let listener = TcpListener::bind(listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|&v| v).await;
            info!("HTTP server shutting down gracefully");
        })
        .await
}
