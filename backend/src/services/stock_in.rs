//! Stock-in documents
//!
//! A stock-in receives goods from a supplier into a warehouse. The header,
//! its items and the balance increments are written in one transaction; the
//! header stays `PENDING` until every line is applied.

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
use crate::repository::{Audit, Entity, Repository};
use crate::services::balance;
use crate::services::currency::Currency;
use crate::services::product::Product;
use crate::services::supplier::Supplier;
use crate::services::warehouse::Warehouse;

#[derive(Clone)]
pub struct StockInService {
    db: PgPool,
}

/// Stock-in header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockIn {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub warehouse_id: i64,
    pub supplier_id: i64,
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

impl Entity for StockIn {
    const TABLE: &'static str = "stock_in";
    const COLUMNS: &'static str = "id, date, warehouse_id, supplier_id, currency_id, \
        factual_number, unique_number, amount, processing_status, created_at, updated_at, \
        created_by, updated_by, deleted, status";
}

/// Received line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockInItem {
    pub id: i64,
    pub stock_in_id: i64,
    pub product_id: i64,
    pub measurement_count: i32,
    pub in_price: Decimal,
    pub out_price: Decimal,
    pub expire_date: Option<NaiveDate>,
    pub notify_before_day: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for StockInItem {
    const TABLE: &'static str = "stock_in_item";
    const COLUMNS: &'static str = "id, stock_in_id, product_id, measurement_count, in_price, \
        out_price, expire_date, notify_before_day, created_at, updated_at, created_by, \
        updated_by, deleted, status";
}

/// Header with its lines
#[derive(Debug, Clone, Serialize)]
pub struct StockInDocument {
    #[serde(flatten)]
    pub stock_in: StockIn,
    pub items: Vec<StockInItem>,
}

/// Input for a stock-in document
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStockInInput {
    pub warehouse_id: i64,
    pub supplier_id: i64,
    pub currency_id: i64,
    #[validate(length(min = 1, max = 100, message = "Factual number is required"))]
    pub factual_number: String,
    /// Client key; repeating a request with the same key returns the first document
    #[validate(length(min = 1, max = 64))]
    pub unique_number: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<StockInItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInItemInput {
    pub product_id: i64,
    pub measurement_count: i32,
    pub in_price: Decimal,
    pub out_price: Decimal,
    pub expire_date: Option<NaiveDate>,
    pub notify_before_day: Option<i32>,
}

/// Per-product totals for one day
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyProductReport {
    pub product_id: i64,
    pub product_name: String,
    pub sum: Decimal,
    pub measure_count: i64,
}

/// Check every line; the error names the offending item
pub fn validate_items(items: &[StockInItemInput]) -> AppResult<()> {
    for (index, item) in items.iter().enumerate() {
        validate_line(item.measurement_count, item.in_price)
            .and_then(|_| validate_line(item.measurement_count, item.out_price))
            .map_err(|e| AppError::validation(&format!("items[{}]", index), e.to_string()))?;

        if item.notify_before_day.is_some_and(|d| d < 0) {
            return Err(AppError::validation(
                &format!("items[{}].notify_before_day", index),
                "notify_before_day cannot be negative",
            ));
        }
    }

    stock_in_amount(items.iter().map(|i| (i.in_price, i.measurement_count)))
        .map_err(|e| AppError::validation("items", e.to_string()))?;
    Ok(())
}

/// Header amount: sum of `in_price * count` over `(in_price, count)` pairs
pub fn stock_in_amount<I>(lines: I) -> AppResult<Decimal>
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let amounts = lines
        .into_iter()
        .map(|(price, count)| line_amount(price, count))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(document_total(amounts)?)
}

impl StockInService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Receive goods into a warehouse
    pub async fn create(
        &self,
        input: CreateStockInInput,
        actor: &str,
    ) -> AppResult<StockInDocument> {
        input.validate()?;
        validate_items(&input.items)?;

        if let Some(unique_number) = &input.unique_number {
            if let Some(existing) = self.find_by_unique_number(unique_number).await? {
                tracing::info!(
                    stock_in_id = existing.id,
                    "Stock-in replayed for unique number {}",
                    unique_number
                );
                return self.get(existing.id).await;
            }
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
        Repository::<Supplier>::find_by_id_and_deleted_false(&mut *tx, input.supplier_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Supplier))?;
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

        let header = sqlx::query_as::<_, StockIn>(&format!(
            r#"
            INSERT INTO stock_in
                (warehouse_id, supplier_id, currency_id, factual_number, unique_number,
                 amount, processing_status, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $7)
            RETURNING {}
            "#,
            StockIn::COLUMNS
        ))
        .bind(input.warehouse_id)
        .bind(input.supplier_id)
        .bind(input.currency_id)
        .bind(input.factual_number.trim())
        .bind(&unique_number)
        .bind(ProcessingStatus::Pending.as_str())
        .bind(actor)
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
                    .ok_or(AppError::AlreadyExists(Resource::StockIn))?;
                return self.get(existing.id).await;
            }
            Err(err) => return Err(err.into()),
        };

        for line in &merged {
            balance::receive(
                &mut *tx,
                input.warehouse_id,
                line.product_id,
                line.measurement_count,
                actor,
            )
            .await?;
        }

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(insert_item(&mut *tx, header.id, item, actor).await?);
        }

        let stock_in = sqlx::query_as::<_, StockIn>(&format!(
            r#"
            UPDATE stock_in SET amount = $2, processing_status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            StockIn::COLUMNS
        ))
        .bind(header.id)
        .bind(stock_in_amount(
            items.iter().map(|i| (i.in_price, i.measurement_count)),
        )?)
        .bind(ProcessingStatus::Completed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            stock_in_id = stock_in.id,
            warehouse_id = stock_in.warehouse_id,
            lines = items.len(),
            amount = %stock_in.amount,
            "Stock-in completed"
        );

        Ok(StockInDocument { stock_in, items })
    }

    pub async fn get(&self, id: i64) -> AppResult<StockInDocument> {
        let stock_in = Repository::<StockIn>::find_by_id_and_deleted_false(&self.db, id)
            .await?
            .ok_or(AppError::NotFound(Resource::StockIn))?;

        let items = sqlx::query_as::<_, StockInItem>(&format!(
            "SELECT {} FROM stock_in_item WHERE stock_in_id = $1 AND deleted = FALSE ORDER BY id",
            StockInItem::COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(StockInDocument { stock_in, items })
    }

    /// Headers, newest first, optionally for one warehouse
    pub async fn list(
        &self,
        warehouse_id: Option<i64>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockIn>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM stock_in
            WHERE deleted = FALSE AND ($1::BIGINT IS NULL OR warehouse_id = $1)
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, StockIn>(&format!(
            r#"
            SELECT {} FROM stock_in
            WHERE deleted = FALSE AND ($1::BIGINT IS NULL OR warehouse_id = $1)
            ORDER BY date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            StockIn::COLUMNS
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

    /// Products received on `date` (UTC), valued at their out price
    pub async fn daily_report(
        &self,
        date: NaiveDate,
        warehouse_id: Option<i64>,
    ) -> AppResult<Vec<DailyProductReport>> {
        let rows = sqlx::query_as::<_, DailyProductReport>(
            r#"
            SELECT p.id AS product_id,
                   p.name AS product_name,
                   COALESCE(SUM(i.out_price * i.measurement_count), 0) AS sum,
                   COALESCE(SUM(i.measurement_count), 0)::BIGINT AS measure_count
            FROM stock_in_item i
            JOIN stock_in s ON s.id = i.stock_in_id
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

    async fn find_by_unique_number(&self, unique_number: &str) -> AppResult<Option<StockIn>> {
        let row = sqlx::query_as::<_, StockIn>(&format!(
            "SELECT {} FROM stock_in WHERE unique_number = $1",
            StockIn::COLUMNS
        ))
        .bind(unique_number)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }
}

async fn insert_item(
    conn: &mut PgConnection,
    stock_in_id: i64,
    item: &StockInItemInput,
    actor: &str,
) -> AppResult<StockInItem> {
    let row = sqlx::query_as::<_, StockInItem>(&format!(
        r#"
        INSERT INTO stock_in_item
            (stock_in_id, product_id, measurement_count, in_price, out_price,
             expire_date, notify_before_day, created_by, updated_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        RETURNING {}
        "#,
        StockInItem::COLUMNS
    ))
    .bind(stock_in_id)
    .bind(item.product_id)
    .bind(item.measurement_count)
    .bind(item.in_price)
    .bind(item.out_price)
    .bind(item.expire_date)
    .bind(item.notify_before_day.unwrap_or(0))
    .bind(actor)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}
