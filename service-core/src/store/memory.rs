use super::{FindManyQuery, Row, RowStore, StoreError, TextSearch};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process row store for local runs and tests. Clones share data.
///
/// Inserted rows get a v4 `id` and an RFC 3339 `created_at` when the caller
/// leaves them out, mirroring the column defaults of the SQL schema.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads fixture rows verbatim. Values that are not objects are skipped.
    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();
        for value in rows {
            match value {
                Value::Object(row) => entries.push(row),
                other => tracing::warn!(table, value = %other, "Skipping non-object seed row"),
            }
        }
    }

    /// Copy of a table's rows in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn id_matches(row: &Row, id: &str) -> bool {
    match row.get("id") {
        Some(Value::String(v)) => v == id,
        Some(Value::Number(v)) => v.to_string() == id,
        _ => false,
    }
}

fn filter_matches(row: &Row, column: &str, expected: &Value) -> bool {
    let actual = row.get(column).unwrap_or(&Value::Null);
    match expected {
        Value::Array(options) => options.contains(actual),
        _ => actual == expected,
    }
}

fn search_matches(row: &Row, search: &TextSearch) -> bool {
    let term = search.term.to_lowercase();
    search.columns.iter().any(|column| match row.get(column) {
        Some(Value::String(v)) => v.to_lowercase().contains(&term),
        _ => false,
    })
}

fn matches(row: &Row, query: &FindManyQuery) -> bool {
    query
        .filters
        .iter()
        .all(|(column, value)| filter_matches(row, column, value))
        && query.search.as_ref().is_none_or(|s| search_matches(row, s))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn find_by_id(
        &self,
        table: &str,
        id: &str,
        columns: Option<&[&str]>,
    ) -> Result<Option<Row>, StoreError> {
        let tables = self.tables.read().await;
        let Some(row) = tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| id_matches(r, id)))
        else {
            return Ok(None);
        };

        let projected = match columns {
            Some(columns) if !columns.is_empty() => columns
                .iter()
                .filter_map(|c| row.get(*c).map(|v| (c.to_string(), v.clone())))
                .collect(),
            _ => row.clone(),
        };
        Ok(Some(projected))
    }

    async fn find_many(&self, table: &str, query: &FindManyQuery) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches(r, query)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                if order.ascending { ord } else { ord.reverse() }
            });
        }

        if let Some(page) = query.pagination {
            rows = rows
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
                .collect();
        }

        Ok(rows)
    }

    async fn count(&self, table: &str, query: &FindManyQuery) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches(r, query)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, StoreError> {
        if !row.get("id").is_some_and(|v| !v.is_null()) {
            row.insert("id".to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        if !row.contains_key("created_at") {
            row.insert(
                "created_at".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update_by_id(&self, table: &str, id: &str, changes: Row) -> Result<Option<Row>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| id_matches(r, id)))
        else {
            return Ok(None);
        };

        row.extend(changes);
        Ok(Some(row.clone()))
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| !id_matches(r, id));
        Ok(rows.len() != before)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
