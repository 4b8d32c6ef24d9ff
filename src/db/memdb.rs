use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::models::{SceneObject, Session, Transform, DEFAULT_SESSION};

use super::{FileStore, StorageEngine, StorageError, UploadedFile};

#[derive(Default)]
struct Tables {
    sessions: BTreeMap<String, Session>,
    objects: BTreeMap<String, SceneObject>,
}

/// Engine that keeps records in process memory. Files still go to disk.
pub struct MemoryEngine {
    files: FileStore,
    tables: RwLock<Tables>,
}

impl MemoryEngine {
    pub fn new(files: FileStore) -> Self {
        let mut tables = Tables::default();
        tables
            .sessions
            .insert(DEFAULT_SESSION.to_string(), Session::new(DEFAULT_SESSION, DEFAULT_SESSION));
        info!("In-memory storage engine initialized at {}", files.root().display());
        Self {
            files,
            tables: RwLock::new(tables),
        }
    }

    async fn remove_files(&self, objects: &[SceneObject]) {
        for object in objects {
            if object.file_name.is_none() {
                continue;
            }
            if let Err(e) = self.files.remove_object_file(object).await {
                error!("Failed to delete file of object {}: {}", object.uid, e);
            }
        }
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    fn files(&self) -> &FileStore {
        &self.files
    }

    async fn add_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&session.uid) {
            return Err(StorageError::Duplicate(session.uid.clone()));
        }
        tables.sessions.insert(session.uid.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, uid: &str) -> Result<Option<Session>, StorageError> {
        Ok(self.tables.read().await.sessions.get(uid).cloned())
    }

    async fn list_sessions(&self, exclude: &[String]) -> Result<Vec<Session>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|session| !exclude.contains(&session.uid))
            .cloned()
            .collect())
    }

    async fn remove_session(&self, uid: &str) -> Result<bool, StorageError> {
        {
            let mut tables = self.tables.write().await;
            if tables.sessions.remove(uid).is_none() {
                return Ok(false);
            }
            tables.objects.retain(|_, object| object.session != uid);
        }
        if let Err(e) = self.files.remove_session_dir(uid).await {
            error!("Failed to delete files of session {}: {}", uid, e);
        }
        Ok(true)
    }

    async fn add_object(&self, object: &SceneObject, file: Option<&UploadedFile>) -> Result<(), StorageError> {
        {
            let mut tables = self.tables.write().await;
            if tables.objects.contains_key(&object.uid) {
                return Err(StorageError::Duplicate(object.uid.clone()));
            }
            tables.objects.insert(object.uid.clone(), object.clone());
        }
        if let Some(upload) = file {
            if let Err(e) = self.files.place(upload, object).await {
                error!("Failed to move {} for object {}: {}", upload.path.display(), object.uid, e);
                self.tables.write().await.objects.remove(&object.uid);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn get_object(&self, uid: &str) -> Result<Option<SceneObject>, StorageError> {
        Ok(self.tables.read().await.objects.get(uid).cloned())
    }

    async fn list_objects(&self, session: &str) -> Result<Vec<SceneObject>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .objects
            .values()
            .filter(|object| object.session == session)
            .cloned()
            .collect())
    }

    async fn clear(&self, session: &str) -> Result<(), StorageError> {
        self.tables
            .write()
            .await
            .objects
            .retain(|_, object| object.session != session);
        if let Err(e) = self.files.remove_session_dir(session).await {
            error!("Failed to delete files of session {}: {}", session, e);
        }
        Ok(())
    }

    async fn move_object(&self, uid: &str, transform: &Transform) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        match tables.objects.get_mut(uid) {
            Some(object) => {
                transform.apply_to(object);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_object(&self, uid: &str) -> Result<bool, StorageError> {
        let removed = self.tables.write().await.objects.remove(uid);
        match removed {
            Some(object) => {
                self.remove_files(std::slice::from_ref(&object)).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObjectType;

    fn text(uid: &str, session: &str) -> SceneObject {
        SceneObject {
            uid: uid.into(),
            session: session.into(),
            object_type: ObjectType::Text,
            position: [0.0; 3],
            scale: [1.0; 3],
            rotation: [0.0; 4],
            file_name: None,
            url: None,
            text: Some("hi".into()),
        }
    }

    #[tokio::test]
    async fn starts_with_the_default_session() {
        let root = tempfile::tempdir().unwrap();
        let engine = MemoryEngine::new(FileStore::new(root.path()));
        let sessions = engine.list_sessions(&[]).await.unwrap();
        assert_eq!(sessions, vec![Session::new("default", "default")]);
        assert!(engine.list_sessions(&["default".to_string()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_keys_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let engine = MemoryEngine::new(FileStore::new(root.path()));
        let err = engine.add_session(&Session::new("default", "again")).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(uid) if uid == "default"));

        engine.add_object(&text("o1", "default"), None).await.unwrap();
        assert!(engine.add_object(&text("o1", "default"), None).await.is_err());
    }

    #[tokio::test]
    async fn move_reports_missing_objects() {
        let root = tempfile::tempdir().unwrap();
        let engine = MemoryEngine::new(FileStore::new(root.path()));
        let transform = Transform {
            scale: Some([2.0, 2.0, 2.0]),
            ..Transform::default()
        };
        assert!(!engine.move_object("ghost", &transform).await.unwrap());

        engine.add_object(&text("o1", "default"), None).await.unwrap();
        assert!(engine.move_object("o1", &transform).await.unwrap());
        let stored = engine.get_object("o1").await.unwrap().unwrap();
        assert_eq!(stored.scale, [2.0, 2.0, 2.0]);
        assert_eq!(stored.position, [0.0; 3]);
    }
}
