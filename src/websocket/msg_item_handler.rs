use tracing::debug;

use crate::models::Envelope;
use crate::ws::connctx::ConnectionId;
use crate::AppState;

/// ITEM_ADDED. Only non-file objects can be added over the socket; file
/// objects go through the HTTP upload.
pub async fn handle_item_added(state: &AppState, envelope: &Envelope) -> bool {
    match state.coordinator.add_object(&envelope.body, None).await {
        Ok(object) => {
            debug!("Object {} added over websocket", object.uid);
            true
        }
        Err(_) => false,
    }
}

/// ITEM_MOVED, with the sending connection as the moving holder
pub async fn handle_item_moved(state: &AppState, conn: ConnectionId, envelope: &Envelope) -> bool {
    state
        .coordinator
        .move_object(&envelope.uid, conn, &envelope.body)
        .await
}

/// ITEM_REMOVED
pub async fn handle_item_removed(state: &AppState, envelope: &Envelope) -> bool {
    state.coordinator.remove_object(&envelope.uid).await.unwrap_or(false)
}
