//! Durable storage for sessions and objects.
//!
//! The coordinator only ever talks to a [`StorageEngine`]; which engine backs
//! it is decided once at start-up.

pub mod dbscene;
pub mod files;
pub mod memdb;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{SceneObject, Session, Transform};

pub use dbscene::DbScene;
pub use files::{FileStore, UploadedFile};
pub use memdb::MemoryEngine;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("duplicate key {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsafe path component {0:?}")]
    InvalidPath(String),
}

/// CRUD contract consumed by the coordinator.
///
/// Reads return `Ok(None)` on absence. Uniqueness violations surface as
/// [`StorageError::Duplicate`] rather than panicking or poisoning the engine.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    fn files(&self) -> &FileStore;

    async fn add_session(&self, session: &Session) -> Result<(), StorageError>;
    async fn get_session(&self, uid: &str) -> Result<Option<Session>, StorageError>;
    async fn list_sessions(&self, exclude: &[String]) -> Result<Vec<Session>, StorageError>;
    /// Delete a session with all of its objects and files. `Ok(false)` if it did not exist.
    async fn remove_session(&self, uid: &str) -> Result<bool, StorageError>;

    /// Persist `object` and move the uploaded content, if any, under
    /// `session/uid/file name`.
    async fn add_object(&self, object: &SceneObject, file: Option<&UploadedFile>) -> Result<(), StorageError>;
    async fn get_object(&self, uid: &str) -> Result<Option<SceneObject>, StorageError>;
    async fn list_objects(&self, session: &str) -> Result<Vec<SceneObject>, StorageError>;
    /// Delete every object of a session, keeping the session itself
    async fn clear(&self, session: &str) -> Result<(), StorageError>;
    /// Apply a transform. `Ok(false)` if the object does not exist.
    async fn move_object(&self, uid: &str, transform: &Transform) -> Result<bool, StorageError>;
    async fn remove_object(&self, uid: &str) -> Result<bool, StorageError>;

    /// Path of the object's content, only if it has a file name and the file exists
    async fn get_object_file(&self, uid: &str) -> Result<Option<PathBuf>, StorageError> {
        match self.get_object(uid).await? {
            Some(object) => Ok(self.files().existing_file(&object).await),
            None => Ok(None),
        }
    }
}

/// Pick the engine for this process: PostgreSQL when a database URL is
/// configured, the in-memory engine otherwise.
pub async fn init_engine(config: &Config) -> Result<Arc<dyn StorageEngine>, StorageError> {
    let files = FileStore::new(&config.files_dir);
    match &config.db_url {
        Some(db_url) => {
            let engine = DbScene::new(db_url, files).await?;
            info!("Database engine initialized");
            Ok(Arc::new(engine))
        }
        None => {
            warn!("No database URL configured - scene state will not survive a restart");
            Ok(Arc::new(MemoryEngine::new(files)))
        }
    }
}
