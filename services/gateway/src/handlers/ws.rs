use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State},
    response::Response,
};
use market_data::execution::handle_client_frame;
use tracing::{debug, warn};

use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Snapshot first, then every broadcast frame, until either side goes away.
/// Inbound text frames are control requests answered on the same socket.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut subscription = state.publisher.subscribe().await;
    let id = subscription.id();
    debug!(subscriber = %id, "WebSocket session started");

    loop {
        tokio::select! {
            frame = subscription.recv() => {
                let Some(frame) = frame else { break };
                if socket.send(Message::Text(frame.to_string().into())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_client_frame(text.as_str(), state.executor.as_ref()).await;
                        debug!(subscriber = %id, kind = reply.kind(), "Replying to subscriber");
                        let text = match reply.to_json() {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(subscriber = %id, error = %e, "Could not encode reply");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(subscriber = %id, error = %e, "Subscriber socket error");
                        break;
                    }
                }
            }
        }
    }

    // Dropping the subscription removes it from the registry.
    drop(subscription);
    debug!(subscriber = %id, "WebSocket session ended");
}
