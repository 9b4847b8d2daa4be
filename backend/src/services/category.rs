//! Product category service
//!
//! Categories form a tree through `parent_id`. Moving a category is rejected
//! when the new parent lies in its own subtree.

use serde::{Deserialize, Serialize};
use shared::{Pagination, PaginatedResponse};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{map_unique_violation, AppError, AppResult, Resource};
use crate::repository::{Audit, Entity, Repository};

/// Category service
#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

/// Category record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for Category {
    const TABLE: &'static str = "category";
    const COLUMNS: &'static str =
        "id, name, parent_id, created_at, updated_at, created_by, updated_by, deleted, status";
}

/// Input for creating a category
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(custom = "crate::validation::category_name")]
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Input for updating a category
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(custom = "crate::validation::category_name")]
    pub name: Option<String>,
    pub parent_id: Option<i64>,
    /// Move the category to the top level
    #[serde(default)]
    pub clear_parent: bool,
}

/// True when `category_id` appears in the ancestor chain of its new parent.
///
/// `parent_chain` starts with the new parent itself.
pub fn would_create_cycle(category_id: i64, parent_chain: &[i64]) -> bool {
    parent_chain.contains(&category_id)
}

impl CategoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateCategoryInput, actor: &str) -> AppResult<Category> {
        input.validate()?;
        let name = input.name.trim();

        if let Some(parent_id) = input.parent_id {
            self.get(parent_id).await?;
        }

        if Repository::<Category>::exists_where(&self.db, "name", name, None).await? {
            return Err(AppError::AlreadyExists(Resource::Category));
        }

        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO category (name, parent_id, created_by, updated_by)
            VALUES ($1, $2, $3, $3)
            RETURNING {}
            "#,
            Category::COLUMNS
        ))
        .bind(name)
        .bind(input.parent_id)
        .bind(actor)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Category))?;

        Ok(category)
    }

    pub async fn get(&self, id: i64) -> AppResult<Category> {
        Repository::<Category>::find_by_id_and_deleted_false(&self.db, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Category))
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<Category>> {
        Repository::<Category>::find_all_not_deleted_paged(&self.db, pagination).await
    }

    /// Every category, unpaged, for building the tree client-side
    pub async fn list_all(&self) -> AppResult<Vec<Category>> {
        Repository::<Category>::find_all_not_deleted(&self.db).await
    }

    /// Rename and/or move a category
    pub async fn update(
        &self,
        id: i64,
        input: UpdateCategoryInput,
        actor: &str,
    ) -> AppResult<Category> {
        input.validate()?;
        let current = self.get(id).await?;

        let name = match input.name.as_deref().map(str::trim) {
            Some(name) => {
                if Repository::<Category>::exists_where(&self.db, "name", name, Some(id)).await? {
                    return Err(AppError::AlreadyExists(Resource::Category));
                }
                name.to_string()
            }
            None => current.name,
        };

        let parent_id = match (input.clear_parent, input.parent_id) {
            (true, _) => None,
            (false, Some(parent_id)) => {
                self.get(parent_id).await?;
                let chain = self.ancestor_chain(parent_id).await?;
                if would_create_cycle(id, &chain) {
                    return Err(AppError::CategoryCycle);
                }
                Some(parent_id)
            }
            (false, None) => current.parent_id,
        };

        sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE category
            SET name = $2, parent_id = $3, updated_by = $4, updated_at = NOW()
            WHERE id = $1 AND deleted = FALSE
            RETURNING {}
            "#,
            Category::COLUMNS
        ))
        .bind(id)
        .bind(&name)
        .bind(parent_id)
        .bind(actor)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Category))?
        .ok_or(AppError::NotFound(Resource::Category))
    }

    pub async fn delete(&self, id: i64, actor: &str) -> AppResult<()> {
        Repository::<Category>::trash(&self.db, id, actor)
            .await?
            .ok_or(AppError::NotFound(Resource::Category))?;
        Ok(())
    }

    /// Ids from `category_id` up to the root
    async fn ancestor_chain(&self, category_id: i64) -> AppResult<Vec<i64>> {
        let chain = sqlx::query_scalar::<_, i64>(
            r#"
            WITH RECURSIVE ancestors AS (
                SELECT id, parent_id FROM category WHERE id = $1
                UNION
                SELECT c.id, c.parent_id
                FROM category c
                JOIN ancestors a ON c.id = a.parent_id
            )
            SELECT id FROM ancestors
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.db)
        .await?;

        Ok(chain)
    }
}
