use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::models::{Envelope, EventKind};
use crate::ws::connctx::ConnectionId;
use crate::AppState;

use super::msg_item_handler::{handle_item_added, handle_item_moved, handle_item_removed};
use super::msg_selection_handler::handle_selection_changed;
use super::msg_session_handler::{handle_session_added, handle_session_removed};

/// WebSocket handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    debug!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (conn, mut outbound) = state.hub.register().await;
    let Some(evicted) = state.hub.eviction_signal(conn).await else {
        teardown(&state, conn).await;
        return;
    };
    info!("WebSocket connection established: {}", conn);

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Write whatever the hub queues for this connection, in queue order
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Apply inbound frames and relay the accepted ones
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => handle_text(&recv_state, conn, &text).await,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("WebSocket receive error on {}: {}", conn, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other), or for the hub
    // to give up on this connection
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
        _ = evicted.notified() => {
            warn!("WebSocket connection {} dropped by the hub", conn);
            send_task.abort();
            recv_task.abort();
        }
    };

    teardown(&state, conn).await;
    info!("WebSocket connection terminated: {}", conn);
}

/// Decode one frame, apply it, and relay it to the other connections if it
/// was accepted. Malformed frames are ignored.
pub async fn handle_text(state: &AppState, conn: ConnectionId, text: &str) {
    let envelope = match Envelope::parse(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!("Ignoring frame from {}: {}", conn, e);
            return;
        }
    };
    if process_message(state, conn, &envelope).await {
        state.hub.relay_message(envelope.body, conn).await;
    } else {
        debug!("Frame {} for {} from {} not applied", envelope.event.as_str(), envelope.uid, conn);
    }
}

/// Dispatch an envelope to the coordinator. Returns whether it was accepted.
pub async fn process_message(state: &AppState, conn: ConnectionId, envelope: &Envelope) -> bool {
    match envelope.event {
        EventKind::ItemAdded => handle_item_added(state, envelope).await,
        EventKind::ItemMoved => handle_item_moved(state, conn, envelope).await,
        EventKind::ItemRemoved => handle_item_removed(state, envelope).await,
        EventKind::ItemSelectionChanged => handle_selection_changed(state, conn, envelope).await,
        EventKind::SessionAdded => handle_session_added(state, envelope).await,
        EventKind::SessionRemoved => handle_session_removed(state, envelope).await,
    }
}

/// Forget a connection: stop delivering to it, release everything it had
/// selected and announce the moves that this committed.
pub async fn teardown(state: &AppState, conn: ConnectionId) {
    state.hub.unregister(conn).await;
    let moves = state.coordinator.deselect_all(conn).await;
    for (uid, transform) in moves {
        state.hub.item_moved(&uid, &transform, None).await;
    }
}
