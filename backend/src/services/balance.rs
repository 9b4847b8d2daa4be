//! Per-warehouse product balances
//!
//! Balances are only changed through [`receive`] and [`issue`], which run on
//! the connection of an open stock document transaction. Callers apply lines
//! in ascending product order so concurrent documents lock rows in the same
//! order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{apply_stock_in, apply_stock_out, Pagination, PaginatedResponse, StockError};
use sqlx::{FromRow, PgConnection, PgPool};

use crate::error::{AppError, AppResult, Resource};
use crate::repository::Repository;
use crate::services::warehouse::Warehouse;

#[derive(Clone)]
pub struct BalanceService {
    db: PgPool,
}

/// On-hand quantity of one product in one warehouse
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductBalance {
    pub warehouse_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_number: i32,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

async fn lock_quantity(
    conn: &mut PgConnection,
    warehouse_id: i64,
    product_id: i64,
) -> AppResult<Option<i32>> {
    let quantity = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT quantity FROM warehouse_products_balance
        WHERE warehouse_id = $1 AND product_id = $2
        FOR UPDATE
        "#,
    )
    .bind(warehouse_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity)
}

/// Add `count` units to the balance, creating the row on first receipt
pub(crate) async fn receive(
    conn: &mut PgConnection,
    warehouse_id: i64,
    product_id: i64,
    count: i32,
    actor: &str,
) -> AppResult<i32> {
    match lock_quantity(conn, warehouse_id, product_id).await? {
        Some(current) => {
            let quantity = apply_stock_in(current, count)?;
            sqlx::query(
                r#"
                UPDATE warehouse_products_balance
                SET quantity = $3, updated_by = $4, updated_at = NOW()
                WHERE warehouse_id = $1 AND product_id = $2
                "#,
            )
            .bind(warehouse_id)
            .bind(product_id)
            .bind(quantity)
            .bind(actor)
            .execute(&mut *conn)
            .await?;
            Ok(quantity)
        }
        None => {
            apply_stock_in(0, count)?;
            let quantity = sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO warehouse_products_balance
                    (warehouse_id, product_id, quantity, created_by, updated_by)
                VALUES ($1, $2, $3, $4, $4)
                ON CONFLICT (warehouse_id, product_id) DO UPDATE
                SET quantity = warehouse_products_balance.quantity + EXCLUDED.quantity,
                    updated_by = EXCLUDED.updated_by,
                    updated_at = NOW()
                RETURNING quantity
                "#,
            )
            .bind(warehouse_id)
            .bind(product_id)
            .bind(count)
            .bind(actor)
            .fetch_one(&mut *conn)
            .await?;
            Ok(quantity)
        }
    }
}

/// Remove `count` units; fails without touching the row when the balance is short
pub(crate) async fn issue(
    conn: &mut PgConnection,
    warehouse_id: i64,
    product_id: i64,
    count: i32,
    actor: &str,
) -> AppResult<i32> {
    let available = lock_quantity(conn, warehouse_id, product_id)
        .await?
        .unwrap_or(0);

    let remaining = apply_stock_out(available, count).map_err(|e| match e {
        StockError::InsufficientStock {
            available,
            requested,
        } => AppError::InsufficientStock {
            product_id,
            available,
            requested,
        },
        other => AppError::Stock(other),
    })?;

    let updated = sqlx::query(
        r#"
        UPDATE warehouse_products_balance
        SET quantity = quantity - $3, updated_by = $4, updated_at = NOW()
        WHERE warehouse_id = $1 AND product_id = $2 AND quantity >= $3
        "#,
    )
    .bind(warehouse_id)
    .bind(product_id)
    .bind(count)
    .bind(actor)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::InsufficientStock {
            product_id,
            available,
            requested: count,
        });
    }

    Ok(remaining)
}

impl BalanceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Balances of non-deleted products in a warehouse
    pub async fn list(
        &self,
        warehouse_id: i64,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<ProductBalance>> {
        self.ensure_warehouse(warehouse_id).await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM warehouse_products_balance b
            JOIN product p ON p.id = b.product_id
            WHERE b.warehouse_id = $1 AND b.deleted = FALSE AND p.deleted = FALSE
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        let balances = sqlx::query_as::<_, ProductBalance>(
            r#"
            SELECT b.warehouse_id, b.product_id, p.name AS product_name, p.product_number,
                   b.quantity, b.updated_at
            FROM warehouse_products_balance b
            JOIN product p ON p.id = b.product_id
            WHERE b.warehouse_id = $1 AND b.deleted = FALSE AND p.deleted = FALSE
            ORDER BY p.name, b.product_id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(warehouse_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            balances,
            pagination,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Balance of one product; missing when it never entered the warehouse
    pub async fn get(&self, warehouse_id: i64, product_id: i64) -> AppResult<ProductBalance> {
        self.ensure_warehouse(warehouse_id).await?;

        sqlx::query_as::<_, ProductBalance>(
            r#"
            SELECT b.warehouse_id, b.product_id, p.name AS product_name, p.product_number,
                   b.quantity, b.updated_at
            FROM warehouse_products_balance b
            JOIN product p ON p.id = b.product_id
            WHERE b.warehouse_id = $1 AND b.product_id = $2
              AND b.deleted = FALSE AND p.deleted = FALSE
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound(Resource::Balance))
    }

    async fn ensure_warehouse(&self, warehouse_id: i64) -> AppResult<()> {
        Repository::<Warehouse>::find_by_id_and_deleted_false(&self.db, warehouse_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Warehouse))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::seed;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_deleted_product_balance_is_hidden_everywhere(pool: PgPool) {
        let seed = seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        receive(&mut *conn, seed.warehouse_id, seed.milk_id, 3, "tester").await.unwrap();
        receive(&mut *conn, seed.warehouse_id, seed.cheese_id, 2, "tester").await.unwrap();
        drop(conn);

        sqlx::query("UPDATE product SET deleted = TRUE WHERE id = $1")
            .bind(seed.milk_id)
            .execute(&pool)
            .await
            .unwrap();

        let service = BalanceService::new(pool.clone());
        assert!(matches!(
            service.get(seed.warehouse_id, seed.milk_id).await,
            Err(AppError::NotFound(Resource::Balance))
        ));
        assert_eq!(service.get(seed.warehouse_id, seed.cheese_id).await.unwrap().quantity, 2);

        let page = service
            .list(seed.warehouse_id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].product_id, seed.cheese_id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_issue_never_touches_a_short_balance(pool: PgPool) {
        let seed = seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        receive(&mut *conn, seed.warehouse_id, seed.milk_id, 2, "tester").await.unwrap();

        let result = issue(&mut *conn, seed.warehouse_id, seed.milk_id, 3, "tester").await;
        assert!(matches!(
            result,
            Err(AppError::InsufficientStock { available: 2, requested: 3, .. })
        ));
        assert_eq!(
            issue(&mut *conn, seed.warehouse_id, seed.milk_id, 2, "tester").await.unwrap(),
            0
        );
    }
}
