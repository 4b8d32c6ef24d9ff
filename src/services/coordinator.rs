//! Validation, session/object lifecycle and the selection protocol.
//!
//! The coordinator is the only component that mutates shared object state.
//! Selection, pending and parked moves live in a [`SelectionTable`] behind one
//! async mutex; moves and deselections keep that lock across their storage
//! write so durable updates land in the order their critical sections ran.
//! Additions and removals only take it around their selection bookkeeping.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::db::{StorageEngine, StorageError, UploadedFile};
use crate::models::{ObjectDraft, SceneObject, Session, Transform, ValidationError, DEFAULT_SESSION};
use crate::ws::connctx::ConnectionId;

use super::selection::SelectionTable;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("uid {0} is already in use")]
    UidInUse(String),
    #[error("session {0} does not exist")]
    UnknownSession(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StateError {
    /// Whether the submission itself was at fault, as opposed to the backend
    pub fn is_rejection(&self) -> bool {
        match self {
            StateError::Validation(_) | StateError::UidInUse(_) | StateError::UnknownSession(_) => true,
            StateError::Storage(StorageError::Duplicate(_)) => true,
            StateError::Storage(_) => false,
        }
    }
}

/// Result of a deselection
#[derive(Debug, Clone, PartialEq)]
pub struct Deselection {
    /// The holder was selecting the object
    pub accepted: bool,
    /// The holder's buffered move, if it was committed to storage
    pub forwarded: Option<Transform>,
}

/// Counters reported by the diagnostics endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionStats {
    pub selected: usize,
    pub pending: usize,
    pub parked: usize,
}

pub struct Coordinator {
    engine: Arc<dyn StorageEngine>,
    selection: Mutex<SelectionTable>,
}

impl Coordinator {
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            selection: Mutex::new(SelectionTable::new()),
        }
    }

    pub fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.engine
    }

    // Sessions

    pub async fn add_session(&self, data: &Map<String, Value>) -> Result<Session, StateError> {
        let session = Session::from_fields(data)?;
        debug!("Adding session: {} : {}", session.uid, session.name);
        self.engine.add_session(&session).await.map_err(|e| {
            info!("Session {} not added: {}", session.uid, e);
            e
        })?;
        Ok(session)
    }

    pub async fn get_session(&self, uid: &str) -> Result<Option<Session>, StateError> {
        Ok(self.engine.get_session(uid).await?)
    }

    pub async fn list_sessions(&self, exclude: &[String]) -> Result<Vec<Session>, StateError> {
        Ok(self.engine.list_sessions(exclude).await?)
    }

    /// Every session except `default`
    pub async fn list_removable_sessions(&self) -> Result<Vec<Session>, StateError> {
        self.list_sessions(&[DEFAULT_SESSION.to_string()]).await
    }

    pub async fn list_session_uids(&self, exclude: &[String]) -> Result<Vec<String>, StateError> {
        let sessions = self.list_sessions(exclude).await?;
        Ok(sessions.into_iter().map(|session| session.uid).collect())
    }

    pub fn can_remove_session(&self, uid: &str) -> bool {
        uid != DEFAULT_SESSION
    }

    /// Remove a session with all of its objects. `Ok(false)` for `default` and
    /// for sessions that do not exist.
    pub async fn remove_session(&self, uid: &str) -> Result<bool, StateError> {
        if !self.can_remove_session(uid) {
            return Ok(false);
        }
        debug!("Removing session: {}", uid);
        let objects = self.list_object_uids(uid).await?;
        let existed = self.engine.remove_session(uid).await.map_err(|e| {
            error!("Failed to remove session {}: {}", uid, e);
            StateError::from(e)
        })?;
        if existed {
            self.forget_objects(&objects).await;
        }
        Ok(existed)
    }

    // Objects

    /// Validate a submitted object and store its canonical record.
    ///
    /// On failure the caller still owns `file` and must discard it.
    pub async fn add_object(
        &self,
        data: &Map<String, Value>,
        file: Option<&UploadedFile>,
    ) -> Result<SceneObject, StateError> {
        let draft = ObjectDraft::new(data).map_err(|e| reject(data, e))?;
        if self.engine.get_object(draft.uid).await?.is_some() {
            info!("Skipping object {} which already exists", draft.uid);
            return Err(StateError::UidInUse(draft.uid.to_string()));
        }
        if self.engine.get_session(draft.session).await?.is_none() {
            info!("Skipping object {} with invalid session {}", draft.uid, draft.session);
            return Err(StateError::UnknownSession(draft.session.to_string()));
        }
        let mut object = draft.finish(file.is_some()).map_err(|e| reject(data, e))?;

        if let Some(upload) = file {
            if let Ok(meta) = tokio::fs::metadata(&upload.path).await {
                debug!("File name: {:?}, size: {}", object.file_name, meta.len());
            }
        }

        let parked = self.selection.lock().await.take_parked(&object.uid);
        if let Some(transform) = &parked {
            debug!("Applying parked move to {}", object.uid);
            transform.apply_to(&mut object);
        }
        if let Err(e) = self.engine.add_object(&object, file).await {
            error!("Failed to store object {}: {}", object.uid, e);
            if let Some(transform) = parked {
                self.selection.lock().await.park(&object.uid, transform);
            }
            return Err(e.into());
        }

        // A move parked while the record was being written
        let late = self.selection.lock().await.take_parked(&object.uid);
        if let Some(transform) = late {
            match self.engine.move_object(&object.uid, &transform).await {
                Ok(true) => transform.apply_to(&mut object),
                Ok(false) => {}
                Err(e) => error!("Failed to apply parked move to {}: {}", object.uid, e),
            }
        }
        debug!("Added object {}", object.uid);
        Ok(object)
    }

    pub async fn get_object(&self, uid: &str) -> Result<Option<SceneObject>, StateError> {
        Ok(self.engine.get_object(uid).await?)
    }

    pub async fn get_object_file(&self, uid: &str) -> Result<Option<PathBuf>, StateError> {
        Ok(self.engine.get_object_file(uid).await?)
    }

    pub async fn list_objects(&self, session: &str) -> Result<Vec<SceneObject>, StateError> {
        Ok(self.engine.list_objects(session).await?)
    }

    pub async fn list_object_uids(&self, session: &str) -> Result<Vec<String>, StateError> {
        let objects = self.list_objects(session).await?;
        Ok(objects.into_iter().map(|object| object.uid).collect())
    }

    /// Delete every object of a session, keeping the session
    pub async fn clear_session(&self, session: &str) -> Result<(), StateError> {
        debug!("Removing all objects in session {}", session);
        let objects = self.list_object_uids(session).await?;
        self.engine.clear(session).await?;
        self.forget_objects(&objects).await;
        Ok(())
    }

    /// Remove an object and whatever selection state still refers to it.
    /// `Ok(false)` if there was no such object.
    pub async fn remove_object(&self, uid: &str) -> Result<bool, StateError> {
        debug!("Removing object: {}", uid);
        let existed = self.engine.remove_object(uid).await.map_err(|e| {
            error!("Failed to remove object {}: {}", uid, e);
            StateError::from(e)
        })?;
        self.forget_objects(&[uid.to_string()]).await;
        Ok(existed)
    }

    async fn forget_objects(&self, uids: &[String]) {
        let mut selection = self.selection.lock().await;
        for uid in uids {
            selection.forget(uid);
        }
    }

    /// Fill the default session with a link and a text object
    pub async fn seed_demo_objects(&self) {
        let demo = [
            json!({
                "Uid": "7e10441e-c88e-4d8c-9e6b-60cf96bbadc6",
                "Session": DEFAULT_SESSION,
                "ObjectType": "Link",
                "Position": [0.0, 0.0, 0.0],
                "Scale": [1.0, 1.0, 1.0],
                "Rotation": [0.0, 0.0, 0.0, 0.0],
                "Url": "http://localhost"
            }),
            json!({
                "Uid": "e87ecfcc-5bd2-4ff3-a4e9-179f52063471",
                "Session": DEFAULT_SESSION,
                "ObjectType": "Text",
                "Position": [0.0, 0.0, 0.0],
                "Scale": [1.0, 1.0, 1.0],
                "Rotation": [0.0, 0.0, 0.0, 0.0],
                "Text": "Hello from the default session"
            }),
        ];
        for value in demo {
            let Value::Object(data) = value else { continue };
            if let Err(e) = self.add_object(&data, None).await {
                info!("Demo object not added: {}", e);
            }
        }
    }

    // Selection protocol

    pub async fn is_selected(&self, uid: &str, holder: Option<ConnectionId>) -> bool {
        self.selection.lock().await.is_selected(uid, holder)
    }

    pub async fn select(&self, uid: &str, holder: ConnectionId) -> bool {
        self.selection.lock().await.select(uid, holder);
        true
    }

    /// Move an object on behalf of `holder`.
    ///
    /// While anyone selects the object the move is only buffered in the
    /// holder's pending slot; otherwise it goes straight to storage. Returns
    /// whether the move was accepted, not whether storage changed.
    pub async fn move_object(&self, uid: &str, holder: ConnectionId, message: &Map<String, Value>) -> bool {
        let transform = match Transform::from_message(message) {
            Ok(transform) => transform,
            Err(e) => {
                info!("Not moving object {}: {}", uid, e);
                return false;
            }
        };
        debug!("Moving object: {} {:?}", uid, transform);

        let mut selection = self.selection.lock().await;
        if selection.is_selected(uid, None) {
            if selection.buffer_move(uid, holder, &transform) {
                debug!("Postponing move of {} for {}", uid, holder);
            } else {
                debug!("Discarding move of {} from {} which does not hold it", uid, holder);
            }
            return true;
        }

        match self.engine.move_object(uid, &transform).await {
            Ok(true) => true,
            Ok(false) => {
                debug!("Parking move of unknown object {}", uid);
                selection.park(uid, transform);
                true
            }
            Err(e) => {
                error!("Failed to move object {}: {}", uid, e);
                false
            }
        }
    }

    /// Release `holder`'s selection of `uid`.
    ///
    /// The holder's buffered move is committed only when no other holder is
    /// left; a release while others still hold the object discards it.
    pub async fn deselect(&self, uid: &str, holder: ConnectionId) -> Deselection {
        let mut selection = self.selection.lock().await;
        self.deselect_locked(&mut selection, uid, holder).await
    }

    /// Release everything `holder` selects, as on connection teardown.
    /// Returns the moves that were committed so they can be broadcast.
    pub async fn deselect_all(&self, holder: ConnectionId) -> BTreeMap<String, Transform> {
        let mut selection = self.selection.lock().await;
        let mut moves = BTreeMap::new();
        for uid in selection.held_by(holder) {
            let result = self.deselect_locked(&mut selection, &uid, holder).await;
            if let Some(transform) = result.forwarded {
                moves.insert(uid, transform);
            }
        }
        moves
    }

    async fn deselect_locked(&self, selection: &mut SelectionTable, uid: &str, holder: ConnectionId) -> Deselection {
        let Some(release) = selection.release(uid, holder) else {
            return Deselection {
                accepted: false,
                forwarded: None,
            };
        };
        let forwarded = match release.pending {
            Some(transform) if release.last && !transform.is_empty() => {
                debug!("Completing move: {} -> {:?}", uid, transform);
                match self.engine.move_object(uid, &transform).await {
                    Ok(true) => Some(transform),
                    Ok(false) => {
                        selection.park(uid, transform);
                        None
                    }
                    Err(e) => {
                        error!("Failed to complete move of {}: {}", uid, e);
                        None
                    }
                }
            }
            Some(_) if !release.last => {
                warn!("Discarding buffered move of {} from {}: other holders remain", uid, holder);
                None
            }
            _ => None,
        };
        Deselection {
            accepted: true,
            forwarded,
        }
    }

    pub async fn selection_stats(&self) -> SelectionStats {
        let selection = self.selection.lock().await;
        SelectionStats {
            selected: selection.selected_count(),
            pending: selection.pending_count(),
            parked: selection.parked_count(),
        }
    }
}

fn reject(data: &Map<String, Value>, e: ValidationError) -> StateError {
    info!("Skipping object {:?}: {}", data.get("Uid"), e);
    StateError::Validation(e)
}
