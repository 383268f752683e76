pub mod bus;
pub mod events;
pub mod membership;
pub mod registry;
pub mod relay;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{debug_handler, Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::auth::{token, Identity};
use crate::{AppResult, AppState};

use events::{ClientEvent, ServerEvent};
use registry::{ConnId, Registry};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(connect))
}

#[derive(Deserialize)]
struct ConnectQuery {
    token: String,
}

/// The credential rides in the handshake query, not a header; verification
/// happens before the upgrade, so a bad token never reaches the event layer.
#[debug_handler(state = AppState)]
async fn connect(
    State(state): State<AppState>,
    Query(ConnectQuery { token }): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(user) = token::verify(&state.keys, &token) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid or expired token" })),
        )
            .into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(state, user, socket))
}

async fn handle_socket(state: AppState, user: Identity, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (conn, mut rx) = state.registry.register(&user);
    tracing::info!(username = %user.username, %conn, "socket connected");

    let forward_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    match membership::bootstrap_connection(&state, conn, &user).await {
        Err(e) => {
            // failing the connection, not the process
            tracing::error!(username = %user.username, error = %e, "connection bootstrap failed");
        }
        Ok(()) => {
            while let Some(Ok(msg)) = receiver.next().await {
                let Message::Text(text) = msg else { continue };
                let event = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(error = %e, "ignoring malformed frame");
                        continue;
                    }
                };
                if let Err(e) = dispatch(&state, conn, &user, event).await {
                    if e.is_internal() {
                        tracing::error!(username = %user.username, error = %e, "socket event failed");
                    }
                    state.registry.send_to(
                        conn,
                        ServerEvent::Error {
                            message: e.message(),
                        },
                    );
                }
            }
        }
    }

    state.registry.remove(conn);
    forward_task.abort();
    tracing::info!(username = %user.username, %conn, "socket disconnected");
}

async fn dispatch(state: &AppState, conn: ConnId, user: &Identity, event: ClientEvent) -> AppResult<()> {
    match event {
        ClientEvent::JoinRoom(room_id) => membership::join_room(state, conn, user, &room_id).await,
        ClientEvent::SendMessage { room_id, content } => {
            relay::send_message(state, user, &room_id, &content).await
        }
        ClientEvent::CreateOrJoinMemoRoom => membership::open_memo_room(state, conn, user).await,
    }
}

/// Forward bus envelopes into this process's registry. One per process,
/// spawned at startup.
pub fn spawn_dispatcher(bus: &bus::Bus, registry: Registry) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => registry.deliver(&envelope.target, &envelope.event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "bus receiver lagged, envelopes dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
