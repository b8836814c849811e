use std::str::FromStr;

use anyhow::{Context, Result};
use procure_core::{Field, FieldValue, Filter, GroupCount, Matcher, PurchaseOrder};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::PurchaseOrderRepository;

#[derive(Debug, Clone, PartialEq)]
enum SqlValue {
    Int(i64),
    Text(String),
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url {}", database_url))?
            .create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(8);
        if database_url.contains(":memory:") {
            // Each in-memory connection is its own database; keep exactly one alive.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!(database_url = %database_url, "sqlite purchase order store ready");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS purchase_orders (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              purchase_order_number TEXT,
              department_name TEXT NOT NULL,
              item_name TEXT NOT NULL,
              acquisition_method TEXT NOT NULL,
              supplier_name TEXT,
              purchase_year INTEGER,
              purchase_quarter TEXT,
              quantity REAL,
              unit_price REAL,
              total_price REAL,
              purchase_date TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_purchase_orders_period
            ON purchase_orders (purchase_year, purchase_quarter);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl PurchaseOrderRepository for SqliteStore {
    async fn distinct_values(&self, field: Field) -> Result<Vec<String>> {
        let column = field.column();
        let sql = format!(
            "SELECT DISTINCT {column} AS value FROM purchase_orders \
             WHERE {column} IS NOT NULL AND TRIM({column}) <> ''"
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let values = rows
            .into_iter()
            .map(|row| row.try_get::<String, _>("value"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(values)
    }

    async fn sum(&self, filter: &Filter, field: Field) -> Result<Option<f64>> {
        let (clause, values) = where_clause(filter, &[]);
        let sql = format!(
            "SELECT SUM({}) AS total FROM purchase_orders{clause}",
            field.column()
        );

        let row = bind_values(sqlx::query(&sql), &values)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<Option<f64>, _>("total")?)
    }

    async fn group_count(
        &self,
        filter: &Filter,
        group_by: Field,
        limit: usize,
    ) -> Result<Vec<GroupCount>> {
        let column = group_by.column();
        let (clause, mut values) = where_clause(filter, &[format!("{column} IS NOT NULL")]);
        let sql = format!(
            "SELECT {column} AS key, COUNT(*) AS n FROM purchase_orders{clause} \
             GROUP BY {column} ORDER BY n DESC, key ASC LIMIT ?"
        );
        values.push(SqlValue::Int(limit as i64));

        let rows = bind_values(sqlx::query(&sql), &values)
            .fetch_all(&self.pool)
            .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(GroupCount {
                key: row.try_get("key")?,
                count: row.try_get::<i64, _>("n")? as u64,
            });
        }
        Ok(groups)
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let (clause, values) = where_clause(filter, &[]);
        let sql = format!("SELECT COUNT(*) AS n FROM purchase_orders{clause}");

        let row = bind_values(sqlx::query(&sql), &values)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }

    async fn find_one(&self, filter: &Filter, projection: Field) -> Result<Option<FieldValue>> {
        let (clause, values) = where_clause(filter, &[]);
        let sql = format!(
            "SELECT {} AS value FROM purchase_orders{clause} ORDER BY id LIMIT 1",
            projection.column()
        );

        let Some(row) = bind_values(sqlx::query(&sql), &values)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let value = match projection {
            Field::PurchaseYear => row
                .try_get::<Option<i64>, _>("value")?
                .map(FieldValue::Integer),
            Field::UnitPrice | Field::TotalPrice => row
                .try_get::<Option<f64>, _>("value")?
                .map(FieldValue::Number),
            _ => row
                .try_get::<Option<String>, _>("value")?
                .map(FieldValue::Text),
        };
        Ok(value)
    }

    async fn insert_orders(&self, orders: &[PurchaseOrder]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0_u64;

        for order in orders.iter().cloned().map(PurchaseOrder::normalized) {
            let result = sqlx::query(
                r#"
                INSERT INTO purchase_orders (
                  purchase_order_number, department_name, item_name, acquisition_method,
                  supplier_name, purchase_year, purchase_quarter, quantity, unit_price,
                  total_price, purchase_date
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&order.purchase_order_number)
            .bind(&order.department_name)
            .bind(&order.item_name)
            .bind(&order.acquisition_method)
            .bind(&order.supplier_name)
            .bind(order.purchase_year)
            .bind(order.purchase_quarter.map(|quarter| quarter.as_str()))
            .bind(order.quantity)
            .bind(order.unit_price)
            .bind(order.total_price)
            .bind(order.purchase_date.map(|date| date.to_string()))
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

fn where_clause(filter: &Filter, extra: &[String]) -> (String, Vec<SqlValue>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    for constraint in &filter.constraints {
        let column = constraint.field.column();
        match &constraint.matcher {
            Matcher::EqualsInt(value) => {
                conditions.push(format!("{column} = ?"));
                values.push(SqlValue::Int(*value));
            }
            Matcher::EqualsText(value) => {
                conditions.push(format!("{column} = ?"));
                values.push(SqlValue::Text(value.clone()));
            }
            Matcher::ContainsIgnoreCase(value) => {
                // ASCII-only folding; see `PurchaseOrderRepository`.
                conditions.push(format!("instr(lower({column}), lower(?)) > 0"));
                values.push(SqlValue::Text(value.clone()));
            }
        }
    }
    conditions.extend(extra.iter().cloned());

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Int(value) => query.bind(*value),
            SqlValue::Text(value) => query.bind(value.clone()),
        };
    }
    query
}
