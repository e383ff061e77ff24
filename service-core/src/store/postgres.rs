use super::{FindManyQuery, Row, RowStore, StoreError, into_row};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

/// Row store over PostgreSQL. Rows are read back through `row_to_json` and
/// written through `jsonb_populate_record`, so column types come from the
/// table definition rather than from the JSON value.
#[derive(Clone)]
pub struct PgRowStore {
    pool: PgPool,
}

impl PgRowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Table and column names are interpolated, never bound, so they must be
/// plain lowercase identifiers.
fn quote(ident: &str) -> Result<String, StoreError> {
    let mut chars = ident.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_start && valid_rest && ident.len() <= 63 {
        Ok(format!("\"{}\"", ident))
    } else {
        Err(StoreError::InvalidIdentifier(ident.to_string()))
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, query: &FindManyQuery) -> Result<(), StoreError> {
    qb.push(" WHERE TRUE");

    for (column, value) in &query.filters {
        let column = quote(column)?;
        match value {
            Value::Null => {
                qb.push(" AND t.").push(&column).push(" IS NULL");
            }
            Value::Array(_) => {
                qb.push(" AND to_jsonb(t.")
                    .push(&column)
                    .push(") IN (SELECT jsonb_array_elements(")
                    .push_bind(Json(value.clone()))
                    .push("))");
            }
            _ => {
                qb.push(" AND to_jsonb(t.")
                    .push(&column)
                    .push(") = ")
                    .push_bind(Json(value.clone()));
            }
        }
    }

    if let Some(search) = &query.search {
        if !search.columns.is_empty() {
            let pattern = format!("%{}%", escape_like(&search.term));
            qb.push(" AND (");
            for (i, column) in search.columns.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("t.")
                    .push(quote(column)?)
                    .push("::text ILIKE ")
                    .push_bind(pattern.clone());
            }
            qb.push(")");
        }
    }

    Ok(())
}

fn rows_from(values: Vec<Json<Value>>) -> Result<Vec<Row>, StoreError> {
    values.into_iter().map(|Json(v)| into_row(v)).collect()
}

#[async_trait]
impl RowStore for PgRowStore {
    async fn find_by_id(
        &self,
        table: &str,
        id: &str,
        columns: Option<&[&str]>,
    ) -> Result<Option<Row>, StoreError> {
        let select = match columns {
            Some(columns) if !columns.is_empty() => columns
                .iter()
                .map(|c| quote(c))
                .collect::<Result<Vec<_>, _>>()?
                .join(", "),
            _ => "*".to_string(),
        };
        let sql = format!(
            "SELECT row_to_json(s) FROM (SELECT {} FROM {} WHERE id::text = $1) s",
            select,
            quote(table)?
        );

        let row = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|Json(v)| into_row(v)).transpose()
    }

    async fn find_many(&self, table: &str, query: &FindManyQuery) -> Result<Vec<Row>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT row_to_json(t) FROM ");
        qb.push(quote(table)?).push(" AS t");
        push_conditions(&mut qb, query)?;

        if let Some(order) = &query.order_by {
            qb.push(" ORDER BY t.")
                .push(quote(&order.column)?)
                .push(if order.ascending { " ASC" } else { " DESC" });
        }

        if let Some(page) = query.pagination {
            qb.push(" LIMIT ")
                .push_bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
                .push(" OFFSET ")
                .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        }

        let values = qb
            .build_query_scalar::<Json<Value>>()
            .fetch_all(&self.pool)
            .await?;

        rows_from(values)
    }

    async fn count(&self, table: &str, query: &FindManyQuery) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        qb.push(quote(table)?).push(" AS t");
        push_conditions(&mut qb, query)?;

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let table = quote(table)?;

        let value = if row.is_empty() {
            let sql = format!(
                "INSERT INTO {} AS t DEFAULT VALUES RETURNING row_to_json(t)",
                table
            );
            sqlx::query_scalar::<_, Json<Value>>(&sql)
                .fetch_one(&self.pool)
                .await?
        } else {
            let columns = row
                .keys()
                .map(|c| quote(c))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ");
            let sql = format!(
                "INSERT INTO {table} AS t ({columns}) \
                 SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
                 RETURNING row_to_json(t)"
            );
            sqlx::query_scalar::<_, Json<Value>>(&sql)
                .bind(Json(Value::Object(row)))
                .fetch_one(&self.pool)
                .await?
        };

        into_row(value.0)
    }

    async fn update_by_id(&self, table: &str, id: &str, changes: Row) -> Result<Option<Row>, StoreError> {
        if changes.is_empty() {
            return self.find_by_id(table, id, None).await;
        }

        let table = quote(table)?;
        let assignments = changes
            .keys()
            .map(|c| quote(c).map(|c| format!("{c} = p.{c}")))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let sql = format!(
            "UPDATE {table} AS t SET {assignments} \
             FROM jsonb_populate_record(NULL::{table}, $1) AS p \
             WHERE t.id::text = $2 \
             RETURNING row_to_json(t)"
        );

        let value = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(Json(Value::Object(changes)))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        value.map(|Json(v)| into_row(v)).transpose()
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id::text = $1", quote(table)?);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
