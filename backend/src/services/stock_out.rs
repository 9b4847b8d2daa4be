//! Stock-out documents
//!
//! A stock-out issues goods from a warehouse. Lines for the same product are
//! merged before the balance check, and a shortage on any product rolls the
//! whole document back.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    codes, document_total, line_amount, merge_lines, validate_line, Pagination,
    PaginatedResponse, ProcessingStatus, StockLine,
};
use sqlx::{FromRow, PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult, Resource};
use crate::middleware::AuthUser;
use crate::repository::{Audit, Entity, Repository};
use crate::services::balance;
use crate::services::currency::Currency;
use crate::services::employee::Employee;
use crate::services::product::Product;
use crate::services::stock_in::DailyProductReport;
use crate::services::warehouse::Warehouse;

#[derive(Clone)]
pub struct StockOutService {
    db: PgPool,
}

/// Stock-out header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockOut {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub warehouse_id: i64,
    pub employee_id: i64,
    pub currency_id: i64,
    pub factual_number: String,
    pub unique_number: String,
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub processing_status: ProcessingStatus,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for StockOut {
    const TABLE: &'static str = "stock_out";
    const COLUMNS: &'static str = "id, date, warehouse_id, employee_id, currency_id, \
        factual_number, unique_number, amount, processing_status, created_at, updated_at, \
        created_by, updated_by, deleted, status";
}

/// Issued line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockOutItem {
    pub id: i64,
    pub stock_out_id: i64,
    pub product_id: i64,
    pub measurement_count: i32,
    pub out_price: Decimal,
    pub amount: Decimal,
    pub unique_number: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for StockOutItem {
    const TABLE: &'static str = "stock_out_item";
    const COLUMNS: &'static str = "id, stock_out_id, product_id, measurement_count, out_price, \
        amount, unique_number, created_at, updated_at, created_by, updated_by, deleted, status";
}

#[derive(Debug, Clone, Serialize)]
pub struct StockOutDocument {
    #[serde(flatten)]
    pub stock_out: StockOut,
    pub items: Vec<StockOutItem>,
}

/// Input for a stock-out document
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStockOutInput {
    pub warehouse_id: i64,
    pub currency_id: i64,
    #[validate(length(min = 1, max = 100, message = "Factual number is required"))]
    pub factual_number: String,
    /// Client key; repeating a request with the same key returns the first document
    #[validate(length(min = 1, max = 64))]
    pub unique_number: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<StockOutItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockOutItemInput {
    pub product_id: i64,
    pub measurement_count: i32,
    pub out_price: Decimal,
}

/// Whether an employee may issue goods from `warehouse_id`
pub fn can_issue_from(employee: &Employee, warehouse_id: i64) -> bool {
    employee.role.is_admin() || employee.warehouse_id == Some(warehouse_id)
}

pub fn validate_items(items: &[StockOutItemInput]) -> AppResult<()> {
    for (index, item) in items.iter().enumerate() {
        validate_line(item.measurement_count, item.out_price)
            .and_then(|_| line_amount(item.out_price, item.measurement_count))
            .map_err(|e| AppError::validation(&format!("items[{}]", index), e.to_string()))?;
    }

    items
        .iter()
        .map(|i| line_amount(i.out_price, i.measurement_count))
        .collect::<Result<Vec<_>, _>>()
        .and_then(document_total)
        .map_err(|e| AppError::validation("items", e.to_string()))?;
    Ok(())
}

impl StockOutService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Issue goods from a warehouse on behalf of `user`
    pub async fn create(
        &self,
        input: CreateStockOutInput,
        user: &AuthUser,
    ) -> AppResult<StockOutDocument> {
        input.validate()?;
        validate_items(&input.items)?;

        if let Some(unique_number) = &input.unique_number {
            if let Some(existing) = self.find_by_unique_number(unique_number).await? {
                tracing::info!(
                    stock_out_id = existing.id,
                    "Stock-out replayed for unique number {}",
                    unique_number
                );
                return self.get(existing.id).await;
            }
        }

        let employee = Repository::<Employee>::find_active(&self.db, user.employee_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Employee))?;

        if !can_issue_from(&employee, input.warehouse_id) {
            tracing::warn!(
                employee_id = employee.id,
                warehouse_id = input.warehouse_id,
                "Stock-out refused for employee outside the warehouse"
            );
            return Err(AppError::Forbidden(
                "Employee does not belong to this warehouse".to_string(),
            ));
        }

        let lines: Vec<StockLine> = input
            .items
            .iter()
            .map(|i| StockLine {
                product_id: i.product_id,
                measurement_count: i.measurement_count,
            })
            .collect();
        let merged = merge_lines(&lines)?;

        let mut tx = self.db.begin().await?;

        Repository::<Warehouse>::find_active(&mut *tx, input.warehouse_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Warehouse))?;
        Repository::<Currency>::find_by_id_and_deleted_false(&mut *tx, input.currency_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Currency))?;

        let product_ids: Vec<i64> = merged.iter().map(|l| l.product_id).collect();
        let products = Repository::<Product>::find_all_by_ids(&mut *tx, &product_ids).await?;
        if products.len() != product_ids.len() {
            return Err(AppError::NotFound(Resource::Product));
        }

        let unique_number = input
            .unique_number
            .clone()
            .unwrap_or_else(|| codes::generate_code(&mut rand::thread_rng()));

        let header = sqlx::query_as::<_, StockOut>(&format!(
            r#"
            INSERT INTO stock_out
                (warehouse_id, employee_id, currency_id, factual_number, unique_number,
                 amount, processing_status, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $7)
            RETURNING {}
            "#,
            StockOut::COLUMNS
        ))
        .bind(input.warehouse_id)
        .bind(employee.id)
        .bind(input.currency_id)
        .bind(input.factual_number.trim())
        .bind(&unique_number)
        .bind(ProcessingStatus::Pending.as_str())
        .bind(user.actor())
        .fetch_one(&mut *tx)
        .await;

        let header = match header {
            Ok(header) => header,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // A concurrent request with the same key committed first
                drop(tx);
                let existing = self
                    .find_by_unique_number(&unique_number)
                    .await?
                    .ok_or(AppError::AlreadyExists(Resource::StockOut))?;
                return self.get(existing.id).await;
            }
            Err(err) => return Err(err.into()),
        };

        for line in &merged {
            let issued = balance::issue(
                &mut *tx,
                input.warehouse_id,
                line.product_id,
                line.measurement_count,
                user.actor(),
            )
            .await;

            if let Err(AppError::InsufficientStock {
                product_id,
                available,
                requested,
            }) = &issued
            {
                tracing::warn!(
                    warehouse_id = input.warehouse_id,
                    product_id,
                    available,
                    requested,
                    "Stock-out rejected for insufficient stock"
                );
            }
            issued?;
        }

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(insert_item(&mut *tx, header.id, item, user.actor()).await?);
        }

        let amount = document_total(items.iter().map(|i| i.amount))?;
        let stock_out = sqlx::query_as::<_, StockOut>(&format!(
            r#"
            UPDATE stock_out SET amount = $2, processing_status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            StockOut::COLUMNS
        ))
        .bind(header.id)
        .bind(amount)
        .bind(ProcessingStatus::Completed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            stock_out_id = stock_out.id,
            warehouse_id = stock_out.warehouse_id,
            lines = items.len(),
            amount = %stock_out.amount,
            "Stock-out completed"
        );

        Ok(StockOutDocument { stock_out, items })
    }

    pub async fn get(&self, id: i64) -> AppResult<StockOutDocument> {
        let stock_out = Repository::<StockOut>::find_by_id_and_deleted_false(&self.db, id)
            .await?
            .ok_or(AppError::NotFound(Resource::StockOut))?;

        let items = sqlx::query_as::<_, StockOutItem>(&format!(
            "SELECT {} FROM stock_out_item WHERE stock_out_id = $1 AND deleted = FALSE ORDER BY id",
            StockOutItem::COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(StockOutDocument { stock_out, items })
    }

    pub async fn list(
        &self,
        warehouse_id: Option<i64>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockOut>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM stock_out
            WHERE deleted = FALSE AND ($1::BIGINT IS NULL OR warehouse_id = $1)
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, StockOut>(&format!(
            r#"
            SELECT {} FROM stock_out
            WHERE deleted = FALSE AND ($1::BIGINT IS NULL OR warehouse_id = $1)
            ORDER BY date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            StockOut::COLUMNS
        ))
        .bind(warehouse_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            rows,
            pagination,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Products issued on `date` (UTC)
    pub async fn daily_report(
        &self,
        date: NaiveDate,
        warehouse_id: Option<i64>,
    ) -> AppResult<Vec<DailyProductReport>> {
        let rows = sqlx::query_as::<_, DailyProductReport>(
            r#"
            SELECT p.id AS product_id,
                   p.name AS product_name,
                   COALESCE(SUM(i.amount), 0) AS sum,
                   COALESCE(SUM(i.measurement_count), 0)::BIGINT AS measure_count
            FROM stock_out_item i
            JOIN stock_out s ON s.id = i.stock_out_id
            JOIN product p ON p.id = i.product_id
            WHERE s.deleted = FALSE
              AND i.deleted = FALSE
              AND (s.date AT TIME ZONE 'UTC')::date = $1
              AND ($2::BIGINT IS NULL OR s.warehouse_id = $2)
            GROUP BY p.id, p.name
            ORDER BY p.name
            "#,
        )
        .bind(date)
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn find_by_unique_number(&self, unique_number: &str) -> AppResult<Option<StockOut>> {
        let row = sqlx::query_as::<_, StockOut>(&format!(
            "SELECT {} FROM stock_out WHERE unique_number = $1",
            StockOut::COLUMNS
        ))
        .bind(unique_number)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }
}

async fn insert_item(
    conn: &mut PgConnection,
    stock_out_id: i64,
    item: &StockOutItemInput,
    actor: &str,
) -> AppResult<StockOutItem> {
    let amount = line_amount(item.out_price, item.measurement_count)?;
    let unique_number = codes::generate_code(&mut rand::thread_rng());
    let row = sqlx::query_as::<_, StockOutItem>(&format!(
        r#"
        INSERT INTO stock_out_item
            (stock_out_id, product_id, measurement_count, out_price, amount, unique_number,
             created_by, updated_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING {}
        "#,
        StockOutItem::COLUMNS
    ))
    .bind(stock_out_id)
    .bind(item.product_id)
    .bind(item.measurement_count)
    .bind(item.out_price)
    .bind(amount)
    .bind(&unique_number)
    .bind(actor)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Audit;
    use crate::services::fixtures::{count_rows, quantity, seed, Seed};
    use crate::services::stock_in::{CreateStockInInput, StockInItemInput, StockInService};
    use shared::{Role, Status};
    use std::str::FromStr;

    fn employee(role: Role, warehouse_id: Option<i64>) -> Employee {
        let now = Utc::now();
        Employee {
            id: 7,
            first_name: "Dilnoza".to_string(),
            last_name: "Karimova".to_string(),
            phone_number: "+998931112233".to_string(),
            unique_number: "Zx9Yw8Vu7T".to_string(),
            password_hash: String::new(),
            warehouse_id,
            role,
            audit: Audit {
                created_at: now,
                updated_at: now,
                created_by: None,
                updated_by: None,
                deleted: false,
                status: Status::Active,
            },
        }
    }

    #[test]
    fn test_employee_issues_only_from_own_warehouse() {
        let e = employee(Role::Employee, Some(2));
        assert!(can_issue_from(&e, 2));
        assert!(!can_issue_from(&e, 3));
        assert!(!can_issue_from(&employee(Role::Employee, None), 2));
    }

    #[test]
    fn test_admin_issues_from_any_warehouse() {
        assert!(can_issue_from(&employee(Role::Admin, None), 5));
    }

    #[test]
    fn test_validate_items() {
        let ok = StockOutItemInput {
            product_id: 1,
            measurement_count: 3,
            out_price: Decimal::ONE,
        };
        assert!(validate_items(&[ok.clone()]).is_ok());

        let bad = StockOutItemInput {
            measurement_count: -1,
            ..ok
        };
        assert!(validate_items(&[bad]).is_err());
    }

    #[test]
    fn test_price_beyond_money_range_is_rejected() {
        let huge = StockOutItemInput {
            product_id: 1,
            measurement_count: 2,
            out_price: Decimal::from_str("50000000000000000000000000000").unwrap(),
        };
        match validate_items(&[huge]) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "items[0]"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_line_amount_beyond_money_range_is_rejected() {
        let line = StockOutItemInput {
            product_id: 1,
            measurement_count: 3,
            out_price: Decimal::from_str("9999999999999999.99").unwrap(),
        };
        assert!(validate_items(&[line]).is_err());
    }

    // ========================================================================
    // Database tests
    // ========================================================================

    async fn receive(pool: &PgPool, seed: &Seed, lines: &[(i64, i32)]) {
        let input = CreateStockInInput {
            warehouse_id: seed.warehouse_id,
            supplier_id: seed.supplier_id,
            currency_id: seed.currency_id,
            factual_number: "INV-1".to_string(),
            unique_number: None,
            items: lines
                .iter()
                .map(|(product_id, count)| StockInItemInput {
                    product_id: *product_id,
                    measurement_count: *count,
                    in_price: Decimal::ONE,
                    out_price: Decimal::TWO,
                    expire_date: None,
                    notify_before_day: None,
                })
                .collect(),
        };
        StockInService::new(pool.clone())
            .create(input, "tester")
            .await
            .unwrap();
    }

    fn issue(warehouse_id: i64, unique_number: Option<&str>, lines: &[(i64, i32)]) -> CreateStockOutInput {
        CreateStockOutInput {
            warehouse_id,
            currency_id: 0,
            factual_number: "OUT-1".to_string(),
            unique_number: unique_number.map(str::to_string),
            items: lines
                .iter()
                .map(|(product_id, count)| StockOutItemInput {
                    product_id: *product_id,
                    measurement_count: *count,
                    out_price: Decimal::from_str("4.25").unwrap(),
                })
                .collect(),
        }
    }

    fn issue_for(seed: &Seed, unique_number: Option<&str>, lines: &[(i64, i32)]) -> CreateStockOutInput {
        CreateStockOutInput {
            currency_id: seed.currency_id,
            ..issue(seed.warehouse_id, unique_number, lines)
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_shortage_rolls_back_whole_document(pool: PgPool) {
        let seed = seed(&pool).await;
        receive(&pool, &seed, &[(seed.milk_id, 5), (seed.cheese_id, 1)]).await;
        let service = StockOutService::new(pool.clone());

        let result = service
            .create(
                issue_for(&seed, None, &[(seed.milk_id, 3), (seed.cheese_id, 2)]),
                &seed.admin,
            )
            .await;

        match result {
            Err(AppError::InsufficientStock {
                product_id,
                available,
                requested,
            }) => {
                assert_eq!(product_id, seed.cheese_id);
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected result: {:?}", other.map(|d| d.stock_out.id)),
        }
        assert_eq!(count_rows(&pool, "stock_out").await, 0);
        assert_eq!(count_rows(&pool, "stock_out_item").await, 0);
        assert_eq!(quantity(&pool, seed.warehouse_id, seed.milk_id).await, Some(5));
        assert_eq!(quantity(&pool, seed.warehouse_id, seed.cheese_id).await, Some(1));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_issuing_whole_balance_leaves_zero(pool: PgPool) {
        let seed = seed(&pool).await;
        receive(&pool, &seed, &[(seed.milk_id, 4)]).await;
        let service = StockOutService::new(pool.clone());

        let doc = service
            .create(issue_for(&seed, None, &[(seed.milk_id, 4)]), &seed.clerk)
            .await
            .unwrap();

        assert_eq!(quantity(&pool, seed.warehouse_id, seed.milk_id).await, Some(0));
        assert_eq!(doc.stock_out.processing_status, ProcessingStatus::Completed);
        assert_eq!(doc.stock_out.amount, Decimal::from_str("17.00").unwrap());
        assert_eq!(doc.items[0].amount, Decimal::from_str("17.00").unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_repeated_lines_are_checked_together(pool: PgPool) {
        let seed = seed(&pool).await;
        receive(&pool, &seed, &[(seed.milk_id, 5)]).await;
        let service = StockOutService::new(pool.clone());

        let result = service
            .create(
                issue_for(&seed, None, &[(seed.milk_id, 3), (seed.milk_id, 3)]),
                &seed.admin,
            )
            .await;

        assert!(matches!(
            result,
            Err(AppError::InsufficientStock { requested: 6, .. })
        ));
        assert_eq!(quantity(&pool, seed.warehouse_id, seed.milk_id).await, Some(5));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_repeated_unique_number_issues_once(pool: PgPool) {
        let seed = seed(&pool).await;
        receive(&pool, &seed, &[(seed.milk_id, 10)]).await;
        let service = StockOutService::new(pool.clone());

        let first = service
            .create(issue_for(&seed, Some("OUT-REPLAY"), &[(seed.milk_id, 4)]), &seed.admin)
            .await
            .unwrap();
        let second = service
            .create(issue_for(&seed, Some("OUT-REPLAY"), &[(seed.milk_id, 4)]), &seed.admin)
            .await
            .unwrap();

        assert_eq!(first.stock_out.id, second.stock_out.id);
        assert_eq!(count_rows(&pool, "stock_out").await, 1);
        assert_eq!(quantity(&pool, seed.warehouse_id, seed.milk_id).await, Some(6));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_clerk_cannot_issue_from_other_warehouse(pool: PgPool) {
        let seed = seed(&pool).await;
        let service = StockOutService::new(pool.clone());

        let input = CreateStockOutInput {
            currency_id: seed.currency_id,
            ..issue(seed.other_warehouse_id, None, &[(seed.milk_id, 1)])
        };
        let result = service.create(input, &seed.clerk).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(count_rows(&pool, "stock_out").await, 0);
    }

}
