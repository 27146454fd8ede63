// ============================
// codecollab-backend/src/ws_router.rs
// ============================
//! HTTP router: WebSocket upgrade, health check and room lookup.
use crate::error::AppError;
use crate::registry::RoomSummary;
use crate::websocket::serve_connection;
use crate::AppState;
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/rooms/{room_id}", get(room_handler))
        .layer(TraceLayer::new_for_http());

    let router = if state.settings.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// Serve the router on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Handler for WebSocket connections
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| serve_connection(socket, gateway))
}

/// Health check endpoint
async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "rooms": state.gateway.registry().len(),
        "connections": state.gateway.hub().len(),
    }))
}

/// Summary of one live room
async fn room_handler(
    Path(room_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RoomSummary>, AppError> {
    state
        .gateway
        .registry()
        .summary(&room_id)
        .map(Json)
        .ok_or(AppError::RoomNotFound(room_id))
}
