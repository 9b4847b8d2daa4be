//! Supplier service

use serde::{Deserialize, Serialize};
use shared::{Pagination, PaginatedResponse};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult, Resource};
use crate::repository::{Audit, Entity, Repository};

#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Supplier record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub phone_number: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for Supplier {
    const TABLE: &'static str = "supplier";
    const COLUMNS: &'static str =
        "id, name, phone_number, created_at, updated_at, created_by, updated_by, deleted, status";
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[validate(custom = "crate::validation::generic_name")]
    pub name: String,
    #[validate(custom = "crate::validation::phone_number")]
    pub phone_number: String,
}

/// Partial supplier update; absent fields keep their value
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSupplierInput {
    #[validate(custom = "crate::validation::generic_name")]
    pub name: Option<String>,
    #[validate(custom = "crate::validation::phone_number")]
    pub phone_number: Option<String>,
}

fn phone_conflict(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::PhoneNumberTaken,
        _ => err.into(),
    }
}

impl SupplierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateSupplierInput, actor: &str) -> AppResult<Supplier> {
        input.validate()?;

        if Repository::<Supplier>::exists_where(&self.db, "phone_number", &input.phone_number, None)
            .await?
        {
            return Err(AppError::PhoneNumberTaken);
        }

        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO supplier (name, phone_number, created_by, updated_by)
            VALUES ($1, $2, $3, $3)
            RETURNING {}
            "#,
            Supplier::COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.phone_number)
        .bind(actor)
        .fetch_one(&self.db)
        .await
        .map_err(phone_conflict)
    }

    pub async fn get(&self, id: i64) -> AppResult<Supplier> {
        Repository::<Supplier>::find_by_id_and_deleted_false(&self.db, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Supplier))
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<Supplier>> {
        Repository::<Supplier>::find_all_not_deleted_paged(&self.db, pagination).await
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateSupplierInput,
        actor: &str,
    ) -> AppResult<Supplier> {
        input.validate()?;
        let current = self.get(id).await?;

        if let Some(phone) = &input.phone_number {
            if Repository::<Supplier>::exists_where(&self.db, "phone_number", phone, Some(id))
                .await?
            {
                return Err(AppError::PhoneNumberTaken);
            }
        }

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(current.name);
        let phone_number = input.phone_number.unwrap_or(current.phone_number);

        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE supplier
            SET name = $2, phone_number = $3, updated_by = $4, updated_at = NOW()
            WHERE id = $1 AND deleted = FALSE
            RETURNING {}
            "#,
            Supplier::COLUMNS
        ))
        .bind(id)
        .bind(&name)
        .bind(&phone_number)
        .bind(actor)
        .fetch_optional(&self.db)
        .await
        .map_err(phone_conflict)?
        .ok_or(AppError::NotFound(Resource::Supplier))
    }

    pub async fn delete(&self, id: i64, actor: &str) -> AppResult<()> {
        Repository::<Supplier>::trash(&self.db, id, actor)
            .await?
            .ok_or(AppError::NotFound(Resource::Supplier))?;
        Ok(())
    }
}
