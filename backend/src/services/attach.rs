//! Product attachment storage
//!
//! Files live on local disk under `{upload_folder}/{YYYY/M/D}/{hash}.{ext}`;
//! the table keeps the metadata and the hash used in public URLs.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use shared::{codes, dated_folder, file_extension, stored_file_name};
use sqlx::{FromRow, PgPool};

use crate::config::AttachConfig;
use crate::error::{AppError, AppResult, Resource};
use crate::repository::{Audit, Entity, Repository};
use crate::services::product::Product;

const HASH_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct AttachService {
    db: PgPool,
    upload_folder: PathBuf,
    url: String,
}

/// Attachment metadata
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Attach {
    pub id: i64,
    pub origin_name: Option<String>,
    pub size: i64,
    pub content_type: Option<String>,
    pub path: String,
    pub file_name: String,
    pub hash: String,
    pub product_id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for Attach {
    const TABLE: &'static str = "attach";
    const COLUMNS: &'static str = "id, origin_name, size, content_type, path, file_name, hash, \
        product_id, created_at, updated_at, created_by, updated_by, deleted, status";
}

/// Public link to an uploaded file
#[derive(Debug, Clone, Serialize)]
pub struct AttachUrl {
    pub hash: String,
    pub url: String,
}

/// Metadata plus its public link
#[derive(Debug, Clone, Serialize)]
pub struct AttachResponse {
    #[serde(flatten)]
    pub attach: Attach,
    pub url: String,
}

/// An upload received from a client
#[derive(Debug)]
pub struct Upload {
    pub origin_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Open link for `hash` under the configured base URL
pub fn open_url(base: &str, hash: &str) -> String {
    format!("{}/open/{}", base.trim_end_matches('/'), hash)
}

impl AttachService {
    pub fn new(db: PgPool, config: &AttachConfig) -> Self {
        Self {
            db,
            upload_folder: PathBuf::from(&config.upload_folder),
            url: config.url.clone(),
        }
    }

    /// Store a file for a product and record it
    pub async fn upload(&self, product_id: i64, upload: Upload, actor: &str) -> AppResult<AttachUrl> {
        if upload.bytes.is_empty() {
            return Err(AppError::validation("file", "Uploaded file is empty"));
        }

        Repository::<Product>::find_by_id_and_deleted_false(&self.db, product_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Product))?;

        let hash = self.free_hash().await?;
        let folder = dated_folder(Utc::now().date_naive());
        let extension = upload.origin_name.as_deref().and_then(file_extension);
        let file_name = stored_file_name(&hash, extension.as_deref());

        let dir = self.upload_folder.join(&folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::StorageError(format!("cannot create {}: {}", dir.display(), e)))?;

        let file_path = dir.join(&file_name);
        tokio::fs::write(&file_path, &upload.bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("cannot write {}: {}", file_path.display(), e)))?;

        let size = i64::try_from(upload.bytes.len()).unwrap_or(i64::MAX);
        let inserted = sqlx::query(
            r#"
            INSERT INTO attach
                (origin_name, size, content_type, path, file_name, hash, product_id, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(&upload.origin_name)
        .bind(size)
        .bind(&upload.content_type)
        .bind(&folder)
        .bind(&file_name)
        .bind(&hash)
        .bind(product_id)
        .bind(actor)
        .execute(&self.db)
        .await;

        if let Err(err) = inserted {
            if let Err(io_err) = tokio::fs::remove_file(&file_path).await {
                tracing::warn!("Could not remove orphaned upload {}: {}", file_path.display(), io_err);
            }
            return Err(err.into());
        }

        tracing::info!(product_id, hash = %hash, size, "Attachment stored");
        Ok(AttachUrl {
            url: open_url(&self.url, &hash),
            hash,
        })
    }

    /// Metadata by hash
    pub async fn get(&self, hash: &str) -> AppResult<AttachResponse> {
        let attach = self.find_by_hash(hash).await?;
        Ok(self.with_url(attach))
    }

    /// Metadata and file contents by hash
    pub async fn open(&self, hash: &str) -> AppResult<(Attach, Vec<u8>)> {
        let attach = self.find_by_hash(hash).await?;
        let file_path = self.file_path(&attach);

        let bytes = tokio::fs::read(&file_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                tracing::error!("Attachment {} is missing on disk at {}", attach.hash, file_path.display());
                AppError::NotFound(Resource::Attach)
            } else {
                AppError::StorageError(format!("cannot read {}: {}", file_path.display(), e))
            }
        })?;

        Ok((attach, bytes))
    }

    /// Soft delete the record and remove the file
    pub async fn delete(&self, hash: &str, actor: &str) -> AppResult<()> {
        let attach = sqlx::query_as::<_, Attach>(&format!(
            r#"
            UPDATE attach SET deleted = TRUE, updated_by = $2, updated_at = NOW()
            WHERE hash = $1 AND deleted = FALSE
            RETURNING {}
            "#,
            Attach::COLUMNS
        ))
        .bind(hash)
        .bind(actor)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound(Resource::Attach))?;

        let file_path = self.file_path(&attach);
        if let Err(e) = tokio::fs::remove_file(&file_path).await {
            tracing::warn!("Could not remove attachment file {}: {}", file_path.display(), e);
        }

        Ok(())
    }

    pub async fn list_for_product(&self, product_id: i64) -> AppResult<Vec<AttachResponse>> {
        Repository::<Product>::find_by_id_and_deleted_false(&self.db, product_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Product))?;

        let attaches = sqlx::query_as::<_, Attach>(&format!(
            "SELECT {} FROM attach WHERE product_id = $1 AND deleted = FALSE ORDER BY id",
            Attach::COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(attaches.into_iter().map(|a| self.with_url(a)).collect())
    }

    async fn find_by_hash(&self, hash: &str) -> AppResult<Attach> {
        sqlx::query_as::<_, Attach>(&format!(
            "SELECT {} FROM attach WHERE hash = $1 AND deleted = FALSE",
            Attach::COLUMNS
        ))
        .bind(hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound(Resource::Attach))
    }

    async fn free_hash(&self) -> AppResult<String> {
        for _ in 0..HASH_ATTEMPTS {
            let candidate = codes::generate_code(&mut rand::thread_rng());
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM attach WHERE hash = $1)",
            )
            .bind(&candidate)
            .fetch_one(&self.db)
            .await?;

            if !taken {
                return Ok(candidate);
            }
        }

        Err(AppError::Internal("Could not allocate an attachment hash".to_string()))
    }

    fn file_path(&self, attach: &Attach) -> PathBuf {
        self.upload_folder.join(&attach.path).join(&attach.file_name)
    }

    fn with_url(&self, attach: Attach) -> AttachResponse {
        AttachResponse {
            url: open_url(&self.url, &attach.hash),
            attach,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_url() {
        assert_eq!(
            open_url("http://localhost:3000/api/v1/attaches", "aB3dE5gH7j"),
            "http://localhost:3000/api/v1/attaches/open/aB3dE5gH7j"
        );
        assert_eq!(
            open_url("https://files.example.uz/", "x"),
            "https://files.example.uz/open/x"
        );
    }
}
