use tracing::debug;

use crate::models::Envelope;
use crate::ws::connctx::ConnectionId;
use crate::AppState;

/// ITEM_SELECTION_CHANGED. Frames without a boolean `IsSelected` are refused.
pub async fn handle_selection_changed(state: &AppState, conn: ConnectionId, envelope: &Envelope) -> bool {
    match envelope.is_selected() {
        Some(true) => state.coordinator.select(&envelope.uid, conn).await,
        Some(false) => {
            let result = state.coordinator.deselect(&envelope.uid, conn).await;
            if let Some(transform) = &result.forwarded {
                debug!("Deselect of {} by {} committed {:?}", envelope.uid, conn, transform);
            }
            result.accepted
        }
        None => false,
    }
}
