//! WebSocket fan-out for live note viewers.
//!
//! Clients connect to `/ws/notes/:note_id` and receive every change event for
//! that note as a JSON text frame, in commit order. When the note is deleted
//! the server sends the `delete_note` event followed by a Close frame; on
//! shutdown every viewer gets a Close frame.

use std::sync::atomic::Ordering;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use notehub_core::{Error, Subscription};

use crate::error::ApiError;
use crate::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(note_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.notes.get_note_by_id(&note_id).await?;
    Ok(ws.on_upgrade(move |socket| handle_ws_connection(socket, note_id, state)))
}

/// Register a viewer of `note_id`, then confirm the note still exists. A
/// delete that ran before the registration cannot close it, so a missing
/// note undoes the registration instead.
async fn subscribe_live(state: &AppState, note_id: &str) -> Result<Subscription, Error> {
    let subscription = state.registry().subscribe(note_id);
    if let Err(e) = state.services.notes.get_note_by_id(note_id).await {
        state.registry().remove(note_id, subscription.id);
        return Err(e);
    }
    Ok(subscription)
}

fn close_frame(reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code: close_code::NORMAL,
        reason: reason.into(),
    }))
}

async fn handle_ws_connection(mut socket: WebSocket, note_id: String, state: AppState) {
    let mut subscription = match subscribe_live(&state, &note_id).await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::info!(note_id = %note_id, error = %e, "Note gone before subscription");
            let _ = socket.send(close_frame("note deleted")).await;
            return;
        }
    };
    let count = state.ws_connections.fetch_add(1, Ordering::Relaxed) + 1;
    let registry = state.registry().clone();
    let subscriber_id = subscription.id;
    tracing::info!(
        note_id = %note_id,
        subscriber_id = %subscriber_id,
        active = count,
        "WebSocket connection opened"
    );

    let (mut sender, mut receiver) = socket.split();
    let ping_every = state.ping_interval;

    // Forward queued events to the client
    let mut send_task = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(ping_every);
        loop {
            tokio::select! {
                message = subscription.rx.recv() => {
                    match message {
                        Some(json) => {
                            if sender.send(Message::Text(json.to_string())).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            // Note deleted or server shutting down
                            let _ = sender.send(close_frame("subscription closed")).await;
                            break;
                        }
                    }
                }
                _ = ping_interval.tick() => {
                    if sender.send(Message::Ping(vec![])).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Clients only ever close; other frames are ignored
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.remove(&note_id, subscriber_id);
    let count = state.ws_connections.fetch_sub(1, Ordering::Relaxed) - 1;
    tracing::info!(
        note_id = %note_id,
        subscriber_id = %subscriber_id,
        active = count,
        "WebSocket connection closed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;
    use notehub_store::Store;

    async fn state_with_note() -> AppState {
        let state = AppState::new(&Store::new(), &ServerConfig::default());
        state
            .services
            .notes
            .create_note("n1", "Groceries", "alice")
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_subscribe_live_registers_viewer() {
        let state = state_with_note().await;
        let subscription = subscribe_live(&state, "n1").await.unwrap();
        assert_eq!(subscription.note_id, "n1");
        assert_eq!(state.registry().subscriber_count("n1"), 1);
    }

    #[tokio::test]
    async fn test_subscribe_live_after_delete_leaves_nothing() {
        let state = state_with_note().await;
        // Deleted between the upgrade check and the registration
        state.services.notes.delete_note("n1", 0).await.unwrap();

        let err = subscribe_live(&state, "n1").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(state.registry().subscriber_count("n1"), 0);
        assert_eq!(state.registry().note_count(), 0);
    }
}
