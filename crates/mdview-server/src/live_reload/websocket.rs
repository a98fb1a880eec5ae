//! WebSocket endpoint for viewer sessions.
//!
//! Each connection registers with the hub on upgrade and stays in a read
//! loop that only tracks liveness; inbound content is ignored.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::hub::ReloadHub;
use crate::state::AppState;

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub.clone()))
}

/// Unregisters the session whenever the connection task exits,
/// regardless of the exit path.
struct SessionGuard {
    hub: ReloadHub,
    id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, hub: ReloadHub) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = hub.register(tx);
    let _guard = SessionGuard { hub, id };

    loop {
        tokio::select! {
            // Forward reload messages to the viewer.
            message = rx.recv() => {
                match message {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            // Inbound traffic only signals the connection is still alive.
            result = socket.recv() => {
                match result {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_session_guard_unregisters_on_drop() {
        let hub = ReloadHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx);

        drop(SessionGuard {
            hub: hub.clone(),
            id,
        });

        tokio::time::timeout(Duration::from_secs(3), hub.drained())
            .await
            .expect("dropping the guard should unregister and drain the hub");
    }
}
