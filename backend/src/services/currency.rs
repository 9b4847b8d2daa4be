//! Currency service

use serde::{Deserialize, Serialize};
use shared::{Pagination, PaginatedResponse};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{map_unique_violation, AppError, AppResult, Resource};
use crate::repository::{Audit, Entity, Repository};

#[derive(Clone)]
pub struct CurrencyService {
    db: PgPool,
}

/// Currency record, e.g. `UZS` or `USD`
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Currency {
    pub id: i64,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for Currency {
    const TABLE: &'static str = "currency";
    const COLUMNS: &'static str =
        "id, name, created_at, updated_at, created_by, updated_by, deleted, status";
}

#[derive(Debug, Deserialize, Validate)]
pub struct CurrencyInput {
    #[validate(custom = "crate::validation::generic_name")]
    pub name: String,
}

impl CurrencyService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CurrencyInput, actor: &str) -> AppResult<Currency> {
        input.validate()?;
        let name = input.name.trim();

        if Repository::<Currency>::exists_where(&self.db, "name", name, None).await? {
            return Err(AppError::AlreadyExists(Resource::Currency));
        }

        sqlx::query_as::<_, Currency>(&format!(
            "INSERT INTO currency (name, created_by, updated_by) VALUES ($1, $2, $2) RETURNING {}",
            Currency::COLUMNS
        ))
        .bind(name)
        .bind(actor)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Currency))
    }

    pub async fn get(&self, id: i64) -> AppResult<Currency> {
        Repository::<Currency>::find_by_id_and_deleted_false(&self.db, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Currency))
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<Currency>> {
        Repository::<Currency>::find_all_not_deleted_paged(&self.db, pagination).await
    }

    pub async fn update(&self, id: i64, input: CurrencyInput, actor: &str) -> AppResult<Currency> {
        input.validate()?;
        let name = input.name.trim();

        self.get(id).await?;
        if Repository::<Currency>::exists_where(&self.db, "name", name, Some(id)).await? {
            return Err(AppError::AlreadyExists(Resource::Currency));
        }

        sqlx::query_as::<_, Currency>(&format!(
            r#"
            UPDATE currency SET name = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1 AND deleted = FALSE
            RETURNING {}
            "#,
            Currency::COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(actor)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Currency))?
        .ok_or(AppError::NotFound(Resource::Currency))
    }

    pub async fn delete(&self, id: i64, actor: &str) -> AppResult<()> {
        Repository::<Currency>::trash(&self.db, id, actor)
            .await?
            .ok_or(AppError::NotFound(Resource::Currency))?;
        Ok(())
    }
}
