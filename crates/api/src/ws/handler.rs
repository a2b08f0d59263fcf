use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use sitewire_core::error::CoreError;
use sitewire_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Browsers cannot set headers on a WebSocket upgrade, so the access token
/// travels in the query string.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// GET /api/v1/ws?token=<jwt>
///
/// Validates the token before upgrading; an anonymous socket is never
/// registered.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsAuthQuery>,
) -> Response {
    let Some(token) = query.token else {
        return AppError::Core(CoreError::Unauthorized("Missing token".into())).into_response();
    };
    let claims = match validate_token(&token, &state.config.jwt) {
        Ok(claims) => claims,
        Err(_) => {
            return AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
                .into_response()
        }
    };

    let ws_manager = Arc::clone(&state.ws_manager);
    ws.on_upgrade(move |socket| handle_socket(socket, ws_manager, claims.sub))
}

/// Run one connection: register it, forward queued frames to the sink and
/// drain inbound frames until the client goes away.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, user_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone(), user_id).await;
    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() || closing {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Clients only read; inbound frames other than Close are ignored.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket disconnected");
}
