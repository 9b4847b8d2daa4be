//! Soft-delete and audit base shared by every table
//!
//! Every table carries the same audit columns (`created_at`, `updated_at`,
//! `created_by`, `updated_by`, `deleted`, `status`). Rows are never removed:
//! deleting flips `deleted`, and every lookup here filters on it.
//!
//! Queries accept any Postgres executor so they run the same on the pool
//! and inside a transaction.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{Pagination, PaginatedResponse, Status};
use sqlx::{postgres::PgRow, Executor, FromRow, PgPool, Postgres};

use crate::error::AppResult;

/// Audit columns, flattened into each entity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    #[serde(skip_serializing)]
    pub deleted: bool,
    #[sqlx(try_from = "String")]
    pub status: Status,
}

/// A table managed by [`Repository`]
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    /// Table name
    const TABLE: &'static str;

    /// Comma separated select list, audit columns included
    const COLUMNS: &'static str;
}

/// Actor recorded when no user is behind a write
pub const SYSTEM_ACTOR: &str = "system";

pub(crate) fn select_by_id_sql(table: &str, columns: &str, active_only: bool) -> String {
    let status = if active_only { " AND status = 'ACTIVE'" } else { "" };
    format!(
        "SELECT {} FROM {} WHERE id = $1 AND deleted = FALSE{}",
        columns, table, status
    )
}

pub(crate) fn select_by_ids_sql(table: &str, columns: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE id = ANY($1) AND deleted = FALSE ORDER BY id",
        columns, table
    )
}

pub(crate) fn select_all_sql(table: &str, columns: &str, paged: bool) -> String {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE deleted = FALSE ORDER BY id DESC",
        columns, table
    );
    if paged {
        sql.push_str(" LIMIT $1 OFFSET $2");
    }
    sql
}

pub(crate) fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {} WHERE deleted = FALSE", table)
}

pub(crate) fn trash_sql(table: &str, columns: &str) -> String {
    format!(
        "UPDATE {} SET deleted = TRUE, updated_by = $2, updated_at = NOW() \
         WHERE id = $1 AND deleted = FALSE RETURNING {}",
        table, columns
    )
}

pub(crate) fn set_status_sql(table: &str, columns: &str) -> String {
    format!(
        "UPDATE {} SET status = $2, updated_by = $3, updated_at = NOW() \
         WHERE id = $1 AND deleted = FALSE RETURNING {}",
        table, columns
    )
}

pub(crate) fn exists_sql(table: &str, column: &str, exclude_self: bool) -> String {
    let exclude = if exclude_self { " AND id <> $2" } else { "" };
    format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1 AND deleted = FALSE{})",
        table, column, exclude
    )
}

/// Generic soft-delete repository for `T`
pub struct Repository<T>(PhantomData<T>);

impl<T: Entity> Repository<T> {
    /// Row by id unless soft-deleted
    pub async fn find_by_id_and_deleted_false<'e, X>(executor: X, id: i64) -> AppResult<Option<T>>
    where
        X: Executor<'e, Database = Postgres>,
    {
        let sql = select_by_id_sql(T::TABLE, T::COLUMNS, false);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Row by id that is neither deleted nor inactive
    pub async fn find_active<'e, X>(executor: X, id: i64) -> AppResult<Option<T>>
    where
        X: Executor<'e, Database = Postgres>,
    {
        let sql = select_by_id_sql(T::TABLE, T::COLUMNS, true);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Non-deleted rows among `ids`, ordered by id
    pub async fn find_all_by_ids<'e, X>(executor: X, ids: &[i64]) -> AppResult<Vec<T>>
    where
        X: Executor<'e, Database = Postgres>,
    {
        let sql = select_by_ids_sql(T::TABLE, T::COLUMNS);
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    /// Soft delete; `None` when the row is missing or already deleted
    pub async fn trash<'e, X>(executor: X, id: i64, actor: &str) -> AppResult<Option<T>>
    where
        X: Executor<'e, Database = Postgres>,
    {
        let sql = trash_sql(T::TABLE, T::COLUMNS);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .bind(actor)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Soft delete several rows in one transaction, one result per id
    pub async fn trash_list(db: &PgPool, ids: &[i64], actor: &str) -> AppResult<Vec<Option<T>>> {
        let mut tx = db.begin().await?;
        let mut trashed = Vec::with_capacity(ids.len());
        for id in ids {
            trashed.push(Self::trash(&mut *tx, *id, actor).await?);
        }
        tx.commit().await?;
        Ok(trashed)
    }

    /// Every non-deleted row, newest first
    pub async fn find_all_not_deleted<'e, X>(executor: X) -> AppResult<Vec<T>>
    where
        X: Executor<'e, Database = Postgres>,
    {
        let sql = select_all_sql(T::TABLE, T::COLUMNS, false);
        let rows = sqlx::query_as::<_, T>(&sql).fetch_all(executor).await?;
        Ok(rows)
    }

    /// One page of non-deleted rows, newest first
    pub async fn find_all_not_deleted_paged(
        db: &PgPool,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<T>> {
        let total = sqlx::query_scalar::<_, i64>(&count_sql(T::TABLE))
            .fetch_one(db)
            .await?;

        let sql = select_all_sql(T::TABLE, T::COLUMNS, true);
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(PaginatedResponse::new(
            rows,
            pagination,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    pub async fn set_status<'e, X>(
        executor: X,
        id: i64,
        status: Status,
        actor: &str,
    ) -> AppResult<Option<T>>
    where
        X: Executor<'e, Database = Postgres>,
    {
        let sql = set_status_sql(T::TABLE, T::COLUMNS);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(actor)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Whether a non-deleted row other than `exclude_id` has `column = value`
    pub async fn exists_where<'e, X>(
        executor: X,
        column: &'static str,
        value: &str,
        exclude_id: Option<i64>,
    ) -> AppResult<bool>
    where
        X: Executor<'e, Database = Postgres>,
    {
        let sql = exists_sql(T::TABLE, column, exclude_id.is_some());
        let mut query = sqlx::query_scalar::<_, bool>(&sql).bind(value);
        if let Some(id) = exclude_id {
            query = query.bind(id);
        }
        Ok(query.fetch_one(executor).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_id_filters_deleted() {
        let sql = select_by_id_sql("warehouse", "id, name", false);
        assert_eq!(
            sql,
            "SELECT id, name FROM warehouse WHERE id = $1 AND deleted = FALSE"
        );
    }

    #[test]
    fn test_find_active_requires_active_status() {
        let sql = select_by_id_sql("warehouse", "id", true);
        assert!(sql.contains("deleted = FALSE"));
        assert!(sql.ends_with("AND status = 'ACTIVE'"));
    }

    #[test]
    fn test_list_excludes_deleted_rows() {
        let sql = select_all_sql("product", "id", false);
        assert!(sql.contains("WHERE deleted = FALSE"));
        assert!(!sql.contains("LIMIT"));
        assert!(select_all_sql("product", "id", true).ends_with("LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn test_trash_only_touches_live_rows() {
        let sql = trash_sql("category", "id");
        assert!(sql.contains("SET deleted = TRUE"));
        assert!(sql.contains("WHERE id = $1 AND deleted = FALSE"));
        assert!(sql.ends_with("RETURNING id"));
    }

    #[test]
    fn test_exists_can_exclude_self() {
        assert_eq!(
            exists_sql("supplier", "phone_number", false),
            "SELECT EXISTS(SELECT 1 FROM supplier WHERE phone_number = $1 AND deleted = FALSE)"
        );
        assert!(exists_sql("supplier", "name", true).contains("AND id <> $2"));
    }

    #[test]
    fn test_set_status_stamps_actor() {
        let sql = set_status_sql("currency", "id");
        assert!(sql.contains("status = $2, updated_by = $3"));
    }
}
