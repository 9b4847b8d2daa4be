//! Measurement unit service (kg, piece, litre, ...)

use serde::{Deserialize, Serialize};
use shared::{Pagination, PaginatedResponse};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{map_unique_violation, AppError, AppResult, Resource};
use crate::repository::{Audit, Entity, Repository};

#[derive(Clone)]
pub struct MeasurementService {
    db: PgPool,
}

/// Measurement record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Measurement {
    pub id: i64,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for Measurement {
    const TABLE: &'static str = "measurement";
    const COLUMNS: &'static str =
        "id, name, created_at, updated_at, created_by, updated_by, deleted, status";
}

#[derive(Debug, Deserialize, Validate)]
pub struct MeasurementInput {
    #[validate(custom = "crate::validation::measurement_name")]
    pub name: String,
}

impl MeasurementService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: MeasurementInput, actor: &str) -> AppResult<Measurement> {
        input.validate()?;
        let name = input.name.trim();

        if Repository::<Measurement>::exists_where(&self.db, "name", name, None).await? {
            return Err(AppError::AlreadyExists(Resource::Measurement));
        }

        sqlx::query_as::<_, Measurement>(&format!(
            "INSERT INTO measurement (name, created_by, updated_by) VALUES ($1, $2, $2) RETURNING {}",
            Measurement::COLUMNS
        ))
        .bind(name)
        .bind(actor)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Measurement))
    }

    pub async fn get(&self, id: i64) -> AppResult<Measurement> {
        Repository::<Measurement>::find_by_id_and_deleted_false(&self.db, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Measurement))
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<Measurement>> {
        Repository::<Measurement>::find_all_not_deleted_paged(&self.db, pagination).await
    }

    pub async fn update(
        &self,
        id: i64,
        input: MeasurementInput,
        actor: &str,
    ) -> AppResult<Measurement> {
        input.validate()?;
        let name = input.name.trim();

        self.get(id).await?;
        if Repository::<Measurement>::exists_where(&self.db, "name", name, Some(id)).await? {
            return Err(AppError::AlreadyExists(Resource::Measurement));
        }

        sqlx::query_as::<_, Measurement>(&format!(
            r#"
            UPDATE measurement SET name = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1 AND deleted = FALSE
            RETURNING {}
            "#,
            Measurement::COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(actor)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Measurement))?
        .ok_or(AppError::NotFound(Resource::Measurement))
    }

    pub async fn delete(&self, id: i64, actor: &str) -> AppResult<()> {
        Repository::<Measurement>::trash(&self.db, id, actor)
            .await?
            .ok_or(AppError::NotFound(Resource::Measurement))?;
        Ok(())
    }
}
