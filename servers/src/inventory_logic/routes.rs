use crate::inventory_logic::state::AppState;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use lib_inventory::core::ChannelReceiver;
use lib_inventory::models::{CableCommand, CableFrame, ChannelPayload};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::{Any, CorsLayer};

pub const TRIGGER_MESSAGE: &str = "WebSocket connection attempt triggered";

static NEXT_CLIENT_ID: AtomicUsize = AtomicUsize::new(1);

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/inventory", get(inventory_handler))
        .route("/api/trigger_websocket_connection", post(trigger_handler))
        .route("/cable", get(cable_handler))
        .route("/up", get(health_handler))
        .layer(cors)
        .with_state(state)
}

/// Serves until `shutdown` fires or its sender is dropped.
pub async fn serve(listener: TcpListener, state: AppState, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let addr = listener.local_addr()?;
    log::info!("Inventory server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            log::info!("Inventory server shutting down.");
        })
        .await
        .context("Inventory server terminated abnormally")
}

async fn inventory_handler(State(state): State<AppState>) -> Response {
    match state.pipeline.current().await {
        Ok(data) => Json(data).into_response(),
        Err(e) => {
            log::error!("Failed to aggregate inventory: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

async fn trigger_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.ingestion.start() {
        log::info!("Ingestion session started by trigger.");
    } else {
        log::debug!("Trigger ignored; ingestion session already active.");
    }
    (StatusCode::OK, Json(json!({ "message": TRIGGER_MESSAGE })))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn cable_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_cable(socket, state))
}

async fn handle_cable(mut socket: WebSocket, state: AppState) {
    let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
    let channel = Arc::clone(state.channel());
    log::info!("Cable client {} connected", client_id);

    let mut subscription: Option<ChannelReceiver> = None;

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<CableCommand>(text.as_str()) {
                    Ok(CableCommand::Subscribe { channel: requested }) => {
                        let reply = if requested == channel.name() {
                            subscription = Some(channel.subscribe());
                            log::info!("Cable client {} subscribed to '{}'", client_id, requested);
                            CableFrame::ConfirmSubscription { channel: requested }
                        } else {
                            log::warn!("Cable client {} asked for unknown channel '{}'", client_id, requested);
                            CableFrame::RejectSubscription { channel: requested }
                        };
                        if send_frame(&mut socket, &reply).await.is_err() {
                            break;
                        }
                    }
                    Ok(CableCommand::Unsubscribe { channel: requested }) => {
                        if requested == channel.name() {
                            subscription = None;
                        }
                    }
                    Err(e) => log::warn!("Cable client {} sent an unknown command: {}", client_id, e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::warn!("Cable client {} transport error: {}", client_id, e);
                    break;
                }
            },
            payload = next_payload(&mut subscription) => match payload {
                Ok(payload) => {
                    let frame = CableFrame::Message {
                        channel: channel.name().to_string(),
                        message: ChannelPayload::clone(&payload),
                    };
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break; // client disconnected
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Cable client {} lagged; skipped {} payload(s)", client_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    log::info!("Cable client {} disconnected", client_id);
}

async fn next_payload(subscription: &mut Option<ChannelReceiver>) -> Result<Arc<ChannelPayload>, RecvError> {
    match subscription {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &CableFrame) -> Result<()> {
    let text = serde_json::to_string(frame)?;
    socket.send(Message::Text(text.into())).await?;
    Ok(())
}
