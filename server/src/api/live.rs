use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::{data, AppState};

/// GET /ws — live feed of device samples.
///
/// Every sample accepted with a device id is pushed to the socket as one
/// JSON text frame. Text frames sent by the client are ingested exactly like
/// `POST /data`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before the upgrade completes so no sample accepted after the
    // handshake is missed.
    let rx = state.hub.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, state, rx))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, mut rx: broadcast::Receiver<Value>) {
    info!("Live feed connection opened");

    loop {
        tokio::select! {
            sample = rx.recv() => {
                match sample {
                    Ok(sample) => {
                        if socket.send(Message::Text(sample.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Live feed subscriber lagging, samples skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match data::parse_sample(text.as_bytes()) {
                        Ok(payload) => {
                            data::accept(&state, payload).await;
                        }
                        Err(e) => debug!("Ignoring live feed message: {e}"),
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = socket.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!("Live feed connection closed");
}
