use crate::models::Envelope;
use crate::AppState;

/// SESSION_ADDED
pub async fn handle_session_added(state: &AppState, envelope: &Envelope) -> bool {
    state.coordinator.add_session(&envelope.body).await.is_ok()
}

/// SESSION_REMOVED. The default session is never removed.
pub async fn handle_session_removed(state: &AppState, envelope: &Envelope) -> bool {
    state.coordinator.remove_session(&envelope.uid).await.unwrap_or(false)
}
