use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::models::SceneObject;

use super::StorageError;

/// Uploaded content waiting in the staging area to be placed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: PathBuf,
}

/// Blob placement under `<root>/<session>/<uid>/<file name>`
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh path in the staging area for an incoming upload
    pub async fn staging_path(&self) -> io::Result<PathBuf> {
        let dir = self.root.join(".incoming");
        fs::create_dir_all(&dir).await?;
        Ok(dir.join(uuid::Uuid::new_v4().to_string()))
    }

    fn session_dir(&self, session: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(component(session)?))
    }

    fn object_dir(&self, session: &str, uid: &str) -> Result<PathBuf, StorageError> {
        Ok(self.session_dir(session)?.join(component(uid)?))
    }

    /// Where the content of `object` lives, whether or not it exists
    pub fn object_path(&self, object: &SceneObject) -> Result<Option<PathBuf>, StorageError> {
        match &object.file_name {
            Some(name) => Ok(Some(self.object_dir(&object.session, &object.uid)?.join(base_name(name)?))),
            None => Ok(None),
        }
    }

    pub async fn existing_file(&self, object: &SceneObject) -> Option<PathBuf> {
        let path = self.object_path(object).ok().flatten()?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Move a staged upload to its final place
    pub async fn place(&self, upload: &UploadedFile, object: &SceneObject) -> Result<PathBuf, StorageError> {
        let target = self
            .object_path(object)?
            .ok_or_else(|| StorageError::InvalidPath(String::new()))?;
        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir).await?;
        }
        if fs::rename(&upload.path, &target).await.is_err() {
            // staging area on another filesystem
            fs::copy(&upload.path, &target).await?;
            fs::remove_file(&upload.path).await?;
        }
        debug!("Placed {} at {}", upload.path.display(), target.display());
        Ok(target)
    }

    /// Delete an object's content and every directory of its chain that is
    /// left empty, never going above the root.
    pub async fn remove_object_file(&self, object: &SceneObject) -> Result<(), StorageError> {
        let Some(path) = self.object_path(object)? else {
            return Ok(());
        };
        debug!("Deleting {}", path.display());
        fs::remove_file(&path).await?;
        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(current).await.is_err() {
                break;
            }
            dir = current.parent();
        }
        Ok(())
    }

    pub async fn remove_session_dir(&self, session: &str) -> Result<(), StorageError> {
        let dir = self.session_dir(session)?;
        if fs::try_exists(&dir).await? {
            debug!("Deleting {}", dir.display());
            fs::remove_dir_all(&dir).await?;
        }
        Ok(())
    }
}

/// A single normal path component, so ids cannot climb out of the root
fn component(name: &str) -> Result<&OsStr, StorageError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Ok(part),
        _ => Err(StorageError::InvalidPath(name.to_string())),
    }
}

/// Last component of a client-supplied file name
fn base_name(name: &str) -> Result<&OsStr, StorageError> {
    Path::new(name)
        .file_name()
        .ok_or_else(|| StorageError::InvalidPath(name.to_string()))
}
