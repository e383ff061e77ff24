//! Table-oriented persistence behind a narrow trait.
//!
//! Rows travel as JSON objects keyed by column name (snake_case). Feature
//! repositories convert to and from their camelCase domain shapes with the
//! helpers in [`casing`].

pub mod casing;
mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgRowStore;

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("store returned a value that is not a row")]
    NotAnObject,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

/// Page selection with the usual clamping: non-numeric or non-positive
/// input falls back to page 1 and the default size, and the size is capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: u64 = 20;
    pub const MAX_PAGE_SIZE: u64 = 100;
    pub const MAX_PAGE: u64 = 1_000_000;

    pub fn normalize(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self::normalize_with(page, page_size, Self::DEFAULT_PAGE_SIZE, Self::MAX_PAGE_SIZE)
    }

    pub fn normalize_with(
        page: Option<&str>,
        page_size: Option<&str>,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Self {
        fn positive(raw: Option<&str>) -> Option<u64> {
            raw.and_then(|v| v.trim().parse::<u64>().ok()).filter(|v| *v > 0)
        }

        Self {
            page: positive(page).unwrap_or(1).min(Self::MAX_PAGE),
            page_size: positive(page_size)
                .unwrap_or(default_page_size)
                .min(max_page_size),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// Case-insensitive substring match over any of `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch {
    pub columns: Vec<String>,
    pub term: String,
}

/// Conjunction of equality filters. An array value matches any of its
/// elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindManyQuery {
    pub filters: Vec<(String, Value)>,
    pub search: Option<TextSearch>,
    pub order_by: Option<OrderBy>,
    pub pagination: Option<Pagination>,
}

impl FindManyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn search(mut self, columns: &[&str], term: impl Into<String>) -> Self {
        self.search = Some(TextSearch {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            term: term.into(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

#[async_trait]
pub trait RowStore: Send + Sync {
    /// `columns` narrows the returned row; `None` returns every column.
    async fn find_by_id(
        &self,
        table: &str,
        id: &str,
        columns: Option<&[&str]>,
    ) -> Result<Option<Row>, StoreError>;

    async fn find_many(&self, table: &str, query: &FindManyQuery) -> Result<Vec<Row>, StoreError>;

    /// Number of rows matching the query's filters and search, ignoring
    /// ordering and pagination.
    async fn count(&self, table: &str, query: &FindManyQuery) -> Result<u64, StoreError>;

    /// Returns the stored row, including generated columns.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Applies `changes` and returns the updated row, or `None` when no row
    /// has that id.
    async fn update_by_id(&self, table: &str, id: &str, changes: Row) -> Result<Option<Row>, StoreError>;

    /// True when a row was removed.
    async fn delete_by_id(&self, table: &str, id: &str) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

pub(crate) fn into_row(value: Value) -> Result<Row, StoreError> {
    match value {
        Value::Object(row) => Ok(row),
        _ => Err(StoreError::NotAnObject),
    }
}
