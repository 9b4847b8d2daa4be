//! Request models shared by several handlers
//!
//! Re-exports models from the shared crate and adds backend-specific query
//! and body types.

use chrono::NaiveDate;
use serde::Deserialize;

pub use shared::models::*;
use shared::Pagination;

/// `?page=&per_page=` query
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

/// Stock document listing query
#[derive(Debug, Default, Deserialize)]
pub struct DocumentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub warehouse_id: Option<i64>,
}

impl DocumentQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

/// `?date=YYYY-MM-DD` daily report query
#[derive(Debug, Deserialize)]
pub struct DailyReportQuery {
    pub date: NaiveDate,
    pub warehouse_id: Option<i64>,
}

/// Body of a status change
#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: Status,
}
