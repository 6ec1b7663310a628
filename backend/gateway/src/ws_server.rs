//! Session event stream over WebSocket.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use kkscan_core::SessionEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::server::AppState;

/// `GET /api/sessions/:id/events`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let session = state.session(&id).await?;
    let rx = session.lock().await.subscribe();
    Ok(ws.on_upgrade(move |socket| handle_connection(socket, id, rx)))
}

async fn handle_connection(socket: WebSocket, id: Uuid, rx: broadcast::Receiver<SessionEvent>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(rx);
    info!(session = %id, "Event stream opened");

    let mut send_task = tokio::spawn(async move {
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(n)) => {
                    warn!(session = %id, skipped = n, "Event stream lagged");
                    continue;
                }
            };
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Only a close frame (or a dropped socket) ends the stream.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                other => debug!(session = %id, ?other, "Ignoring client message"),
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!(session = %id, "Event stream closed");
}
