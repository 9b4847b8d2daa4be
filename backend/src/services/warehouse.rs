//! Warehouse management service

use serde::{Deserialize, Serialize};
use shared::{Pagination, PaginatedResponse, Status};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{map_unique_violation, AppError, AppResult, Resource};
use crate::repository::{Audit, Entity, Repository};

/// Warehouse service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Warehouse record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for Warehouse {
    const TABLE: &'static str = "warehouse";
    const COLUMNS: &'static str =
        "id, name, created_at, updated_at, created_by, updated_by, deleted, status";
}

/// Input for creating or renaming a warehouse
#[derive(Debug, Deserialize, Validate)]
pub struct WarehouseInput {
    #[validate(custom = "crate::validation::warehouse_name")]
    pub name: String,
}

impl WarehouseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a warehouse with a unique name
    pub async fn create(&self, input: WarehouseInput, actor: &str) -> AppResult<Warehouse> {
        input.validate()?;
        let name = input.name.trim();

        if Repository::<Warehouse>::exists_where(&self.db, "name", name, None).await? {
            return Err(AppError::AlreadyExists(Resource::Warehouse));
        }

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "INSERT INTO warehouse (name, created_by, updated_by) VALUES ($1, $2, $2) RETURNING {}",
            Warehouse::COLUMNS
        ))
        .bind(name)
        .bind(actor)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Warehouse))?;

        tracing::info!(warehouse_id = warehouse.id, "Warehouse created by {}", actor);
        Ok(warehouse)
    }

    pub async fn get(&self, id: i64) -> AppResult<Warehouse> {
        Repository::<Warehouse>::find_by_id_and_deleted_false(&self.db, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Warehouse))
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<Warehouse>> {
        Repository::<Warehouse>::find_all_not_deleted_paged(&self.db, pagination).await
    }

    /// Rename a warehouse; the new name must not belong to another warehouse
    pub async fn update(&self, id: i64, input: WarehouseInput, actor: &str) -> AppResult<Warehouse> {
        input.validate()?;
        let name = input.name.trim();

        self.get(id).await?;
        if Repository::<Warehouse>::exists_where(&self.db, "name", name, Some(id)).await? {
            return Err(AppError::AlreadyExists(Resource::Warehouse));
        }

        sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            UPDATE warehouse SET name = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1 AND deleted = FALSE
            RETURNING {}
            "#,
            Warehouse::COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(actor)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Warehouse))?
        .ok_or(AppError::NotFound(Resource::Warehouse))
    }

    pub async fn delete(&self, id: i64, actor: &str) -> AppResult<()> {
        Repository::<Warehouse>::trash(&self.db, id, actor)
            .await?
            .ok_or(AppError::NotFound(Resource::Warehouse))?;
        tracing::info!(warehouse_id = id, "Warehouse deleted by {}", actor);
        Ok(())
    }

    pub async fn set_status(&self, id: i64, status: Status, actor: &str) -> AppResult<Warehouse> {
        Repository::<Warehouse>::set_status(&self.db, id, status, actor)
            .await?
            .ok_or(AppError::NotFound(Resource::Warehouse))
    }
}
