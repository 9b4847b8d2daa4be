//! Product catalog service

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{codes, Pagination, PaginatedResponse};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{map_unique_violation, AppError, AppResult, Resource};
use crate::repository::{Audit, Entity, Repository};
use crate::services::category::Category;
use crate::services::measurement::Measurement;

/// Attempts at drawing a free product number before giving up
const PRODUCT_NUMBER_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Product record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub measurement_id: i64,
    pub product_number: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for Product {
    const TABLE: &'static str = "product";
    const COLUMNS: &'static str = "id, name, category_id, measurement_id, product_number, \
        created_at, updated_at, created_by, updated_by, deleted, status";
}

/// Product with the prices of its most recent stock-in line
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub in_price: Option<Decimal>,
    pub out_price: Option<Decimal>,
}

/// Input for creating or replacing a product
#[derive(Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(custom = "crate::validation::generic_name")]
    pub name: String,
    pub category_id: i64,
    pub measurement_id: i64,
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: ProductInput, actor: &str) -> AppResult<Product> {
        input.validate()?;
        let name = input.name.trim();

        self.ensure_references(input.category_id, input.measurement_id)
            .await?;

        if Repository::<Product>::exists_where(&self.db, "name", name, None).await? {
            return Err(AppError::AlreadyExists(Resource::Product));
        }

        let product_number = self.free_product_number().await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO product (name, category_id, measurement_id, product_number, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {}
            "#,
            Product::COLUMNS
        ))
        .bind(name)
        .bind(input.category_id)
        .bind(input.measurement_id)
        .bind(product_number)
        .bind(actor)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Product))?;

        tracing::info!(
            product_id = product.id,
            product_number = product.product_number,
            "Product created"
        );
        Ok(product)
    }

    pub async fn get(&self, id: i64) -> AppResult<Product> {
        Repository::<Product>::find_by_id_and_deleted_false(&self.db, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Product))
    }

    /// Product with the latest stock-in prices, if it was ever received
    pub async fn get_details(&self, id: i64) -> AppResult<ProductDetails> {
        let product = self.get(id).await?;

        let prices = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT in_price, out_price
            FROM stock_in_item
            WHERE product_id = $1 AND deleted = FALSE
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        let (in_price, out_price) = match prices {
            Some((in_price, out_price)) => (Some(in_price), Some(out_price)),
            None => (None, None),
        };

        Ok(ProductDetails {
            product,
            in_price,
            out_price,
        })
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<Product>> {
        Repository::<Product>::find_all_not_deleted_paged(&self.db, pagination).await
    }

    pub async fn update(&self, id: i64, input: ProductInput, actor: &str) -> AppResult<Product> {
        input.validate()?;
        let name = input.name.trim();

        self.get(id).await?;
        self.ensure_references(input.category_id, input.measurement_id)
            .await?;

        if Repository::<Product>::exists_where(&self.db, "name", name, Some(id)).await? {
            return Err(AppError::AlreadyExists(Resource::Product));
        }

        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE product
            SET name = $2, category_id = $3, measurement_id = $4, updated_by = $5, updated_at = NOW()
            WHERE id = $1 AND deleted = FALSE
            RETURNING {}
            "#,
            Product::COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(input.category_id)
        .bind(input.measurement_id)
        .bind(actor)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Product))?
        .ok_or(AppError::NotFound(Resource::Product))
    }

    pub async fn delete(&self, id: i64, actor: &str) -> AppResult<()> {
        Repository::<Product>::trash(&self.db, id, actor)
            .await?
            .ok_or(AppError::NotFound(Resource::Product))?;
        Ok(())
    }

    /// Soft delete several products at once; every id must exist or nothing is deleted
    pub async fn delete_many(&self, ids: &[i64], actor: &str) -> AppResult<usize> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let found = Repository::<Product>::find_all_by_ids(&self.db, &ids).await?;
        if found.len() != ids.len() {
            return Err(AppError::NotFound(Resource::Product));
        }

        let trashed = Repository::<Product>::trash_list(&self.db, &ids, actor).await?;
        let deleted = trashed.iter().filter(|p| p.is_some()).count();
        tracing::info!(deleted, "Products deleted");
        Ok(deleted)
    }

    async fn ensure_references(&self, category_id: i64, measurement_id: i64) -> AppResult<()> {
        Repository::<Category>::find_by_id_and_deleted_false(&self.db, category_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Category))?;
        Repository::<Measurement>::find_by_id_and_deleted_false(&self.db, measurement_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Measurement))?;
        Ok(())
    }

    async fn free_product_number(&self) -> AppResult<i32> {
        for _ in 0..PRODUCT_NUMBER_ATTEMPTS {
            let candidate = codes::generate_product_number(&mut rand::thread_rng());
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM product WHERE product_number = $1)",
            )
            .bind(candidate)
            .fetch_one(&self.db)
            .await?;

            if !taken {
                return Ok(candidate);
            }
        }

        Err(AppError::Internal(
            "Could not allocate a product number".to_string(),
        ))
    }
}
