use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::{error, info};

use crate::models::{SceneObject, Session, Transform, DEFAULT_SESSION};

use super::{FileStore, StorageEngine, StorageError, UploadedFile};

/// Session Row from database
#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    uid: String,
    name: String,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session::new(row.uid, row.name)
    }
}

/// PostgreSQL engine. Objects are stored as their canonical JSON record.
pub struct DbScene {
    pool: PgPool,
    files: FileStore,
}

impl DbScene {
    /// Create the connection pool and make sure the tables and the
    /// default session exist
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    /// * `files` - Where uploaded content is placed
    pub async fn new(database_url: &str, files: FileStore) -> Result<Self, StorageError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        let db = Self { pool, files };
        db.ensure_tables().await?;
        Ok(db)
    }

    async fn ensure_tables(&self) -> Result<(), StorageError> {
        sqlx::query("CREATE TABLE IF NOT EXISTS scene_sessions (uid TEXT PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS scene_objects (uid TEXT PRIMARY KEY, session TEXT NOT NULL, data JSONB NOT NULL)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS scene_objects_session_idx ON scene_objects (session)")
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT INTO scene_sessions (uid, name) VALUES ($1, $1) ON CONFLICT (uid) DO NOTHING")
            .bind(DEFAULT_SESSION)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StorageEngine for DbScene {
    fn files(&self) -> &FileStore {
        &self.files
    }

    async fn add_session(&self, session: &Session) -> Result<(), StorageError> {
        let result = sqlx::query("INSERT INTO scene_sessions (uid, name) VALUES ($1, $2) ON CONFLICT (uid) DO NOTHING")
            .bind(&session.uid)
            .bind(&session.name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Duplicate(session.uid.clone()));
        }
        Ok(())
    }

    async fn get_session(&self, uid: &str) -> Result<Option<Session>, StorageError> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT uid, name FROM scene_sessions WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Session::from))
    }

    async fn list_sessions(&self, exclude: &[String]) -> Result<Vec<Session>, StorageError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT uid, name FROM scene_sessions WHERE NOT (uid = ANY($1::text[])) ORDER BY uid",
        )
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Session::from).collect())
    }

    async fn remove_session(&self, uid: &str) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM scene_sessions WHERE uid = $1")
            .bind(uid)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        sqlx::query("DELETE FROM scene_objects WHERE session = $1")
            .bind(uid)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if let Err(e) = self.files.remove_session_dir(uid).await {
            error!("Failed to delete files of session {}: {}", uid, e);
        }
        Ok(true)
    }

    async fn add_object(&self, object: &SceneObject, file: Option<&UploadedFile>) -> Result<(), StorageError> {
        let result = sqlx::query(
            "INSERT INTO scene_objects (uid, session, data) VALUES ($1, $2, $3) ON CONFLICT (uid) DO NOTHING",
        )
        .bind(&object.uid)
        .bind(&object.session)
        .bind(Json(object))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Duplicate(object.uid.clone()));
        }

        if let Some(upload) = file {
            if let Err(e) = self.files.place(upload, object).await {
                error!("Failed to move {} for object {}: {}", upload.path.display(), object.uid, e);
                sqlx::query("DELETE FROM scene_objects WHERE uid = $1")
                    .bind(&object.uid)
                    .execute(&self.pool)
                    .await?;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn get_object(&self, uid: &str) -> Result<Option<SceneObject>, StorageError> {
        let data = sqlx::query_scalar::<_, Json<SceneObject>>("SELECT data FROM scene_objects WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(data.map(|Json(object)| object))
    }

    async fn list_objects(&self, session: &str) -> Result<Vec<SceneObject>, StorageError> {
        let data = sqlx::query_scalar::<_, Json<SceneObject>>(
            "SELECT data FROM scene_objects WHERE session = $1 ORDER BY uid",
        )
        .bind(session)
        .fetch_all(&self.pool)
        .await?;
        Ok(data.into_iter().map(|Json(object)| object).collect())
    }

    async fn clear(&self, session: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM scene_objects WHERE session = $1")
            .bind(session)
            .execute(&self.pool)
            .await?;
        if let Err(e) = self.files.remove_session_dir(session).await {
            error!("Failed to delete files of session {}: {}", session, e);
        }
        Ok(())
    }

    async fn move_object(&self, uid: &str, transform: &Transform) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_scalar::<_, Json<SceneObject>>(
            "SELECT data FROM scene_objects WHERE uid = $1 FOR UPDATE",
        )
        .bind(uid)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(Json(mut object)) = current else {
            tx.rollback().await?;
            return Ok(false);
        };

        transform.apply_to(&mut object);
        sqlx::query("UPDATE scene_objects SET data = $2 WHERE uid = $1")
            .bind(uid)
            .bind(Json(&object))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn remove_object(&self, uid: &str) -> Result<bool, StorageError> {
        let removed = sqlx::query_scalar::<_, Json<SceneObject>>("DELETE FROM scene_objects WHERE uid = $1 RETURNING data")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        let Some(Json(object)) = removed else {
            return Ok(false);
        };
        if object.file_name.is_some() {
            if let Err(e) = self.files.remove_object_file(&object).await {
                error!("Failed to delete file of object {}: {}", uid, e);
            }
        }
        Ok(true)
    }
}
