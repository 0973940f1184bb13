//! Live vote tallies over WebSocket
//!
//! GET /api/ws/votes (admin). The first frame is the array of all tallies,
//! then one `{candidate_id, total_votes}` frame per accepted ballot.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::api::middleware::AppState;

/// GET /api/ws/votes
pub async fn live_votes(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| stream_tallies(socket, state))
}

fn text_frame<T: Serialize>(value: &T) -> Option<Message> {
    match serde_json::to_string(value) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode tally frame");
            None
        }
    }
}

async fn stream_tallies(mut socket: WebSocket, state: AppState) {
    // Subscribe before the snapshot so no ballot falls between the two
    let mut updates = state.vote_service.subscribe();

    let snapshot = match state.vote_service.get_all_tallies().await {
        Ok(tallies) => tallies,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load tallies for live feed");
            return;
        }
    };
    let Some(frame) = text_frame(&snapshot) else {
        return;
    };
    if socket.send(frame).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(tally) => {
                    let Some(frame) = text_frame(&tally) else { continue };
                    if socket.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Live tally subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("Live tally subscriber disconnected");
}
