use crate::app::CommandSender;
use crate::handlers::{
    app::{health_check, index},
    callback::callback,
};
use axum::{middleware::from_fn, routing::get, Router};
use explorer_core::error::AppError;
use explorer_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Loopback listener receiving the hosted UI redirects.
pub fn build_router(commands: CommandSender) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/callback", get(callback))
        .route("/health", get(health_check))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                // The query carries the authorization code, so only the path is logged.
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(commands)
}

/// Bind the listener and serve it in the background. Returns the bound
/// address.
pub async fn spawn_callback_listener(
    addr: SocketAddr,
    commands: CommandSender,
) -> Result<SocketAddr, AppError> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
        AppError::config(format!("Failed to bind to address {}: {}", addr, e))
    })?;
    let local_addr = listener.local_addr()?;

    let app = build_router(commands);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Callback listener error: {}", e);
        }
    });

    tracing::info!("Callback listener on {}", local_addr);
    Ok(local_addr)
}
