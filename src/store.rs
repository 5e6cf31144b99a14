//! Database - async executor for built statements
//!
//! Runs the statements produced by [`Query`] and [`DdlGenerator`] on a MySQL
//! connection pool and turns result rows into [`Record`]s.

use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlQueryResult, MySqlRow};
use sqlx::{Column, Row, TypeInfo};

use crate::config::DbConfig;
use crate::error::{QueryError, Result};
use crate::query::{Query, Record};
use crate::sql::ddl::DdlGenerator;

type MySqlQuery<'q> = sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>;

/// Outcome of a write statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// `LAST_INSERT_ID()` of the (last) executed statement
    pub last_insert_id: u64,
    pub rows_affected: u64,
}

impl From<MySqlQueryResult> for ExecResult {
    fn from(result: MySqlQueryResult) -> Self {
        Self {
            last_insert_id: result.last_insert_id(),
            rows_affected: result.rows_affected(),
        }
    }
}

/// MySQL handle
///
/// Wraps a connection pool together with the configuration used for table
/// prefixes and statement logging.
pub struct Database {
    /// Database connection pool
    pool: MySqlPool,
    config: DbConfig,
}

impl Database {
    /// Connect to the database described by `config`
    pub async fn connect(config: DbConfig) -> Result<Self> {
        config.validate()?;
        let pool = MySqlPool::connect_with(config.connect_options())
            .await
            .map_err(|e| QueryError::Connection(format!("Database connection failed: {}", e)))?;

        Ok(Self { pool, config })
    }

    /// Create a handle from an existing pool
    pub fn from_pool(pool: MySqlPool, config: DbConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Start a query on `name`, with the configured prefix applied
    pub fn table(&self, name: &str) -> Query {
        Query::new(self.config.table_name(name))
    }

    pub fn ddl(&self) -> DdlGenerator<'_> {
        DdlGenerator::new(&self.config)
    }

    /// Close the pool, waiting for connections to be returned
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn log_statement(&self, sql: &str, params: usize) {
        if self.config.debug {
            tracing::debug!(sql, params, "executing statement");
        } else {
            tracing::trace!(sql, params, "executing statement");
        }
    }

    async fn explain(&self, sql: &str, params: &[Value]) -> Result<()> {
        if !self.config.explain {
            return Ok(());
        }

        let plan = self.query(&format!("EXPLAIN {}", sql), params).await?;
        for row in plan {
            let row = serde_json::Value::Object(row);
            tracing::debug!(plan = %row, "explain");
        }

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Run a raw statement and return every row
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        self.log_statement(sql, params.len());

        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    /// Run a raw statement and return its first row
    pub async fn one_row(&self, sql: &str, params: &[Value]) -> Result<Record> {
        self.query(sql, params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::not_found("Statement returned no rows"))
    }

    pub async fn select(&self, query: &Query) -> Result<Vec<Record>> {
        let (sql, params) = query.build_select()?;
        self.explain(&sql, &params).await?;
        self.query(&sql, &params).await
    }

    /// First matching row, `NotFound` when there is none
    pub async fn find(&self, query: &Query) -> Result<Record> {
        let (sql, params) = query.build_find()?;
        self.explain(&sql, &params).await?;
        self.query(&sql, &params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::not_found(format!("No rows in '{}'", query.table())))
    }

    /// One column of the first matching row, rendered as text
    ///
    /// `None` when no row matches; a NULL column gives an empty string.
    pub async fn value(&self, query: &Query, field: &str) -> Result<Option<String>> {
        let (sql, params) = query.build_value(field)?;
        let rows = self.query(&sql, &params).await?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .map(|(_, value)| value_to_string(&value)))
    }

    pub async fn count(&self, query: &Query) -> Result<i64> {
        let (sql, params) = query.build_count()?;
        let rows = self.query(&sql, &params).await?;

        Ok(rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(|value| {
                value
                    .as_i64()
                    .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            })
            .unwrap_or(0))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Run a raw write statement
    pub async fn exec(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.log_statement(sql, params.len());

        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;

        Ok(result.into())
    }

    /// Run a raw write statement inside its own transaction
    pub async fn tx_exec(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.log_statement(sql, params.len());

        let mut tx = self.pool.begin().await?;
        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.into())
    }

    /// Run one statement once per parameter row on a single connection
    async fn exec_batch(&self, sql: &str, rows: &[Vec<Value>]) -> Result<ExecResult> {
        let mut conn = self.pool.acquire().await?;
        let mut total = ExecResult::default();

        for (i, params) in rows.iter().enumerate() {
            self.log_statement(sql, params.len());
            let result = bind_params(sqlx::query(sql), params)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    tracing::warn!(row = i, error = %e, "batch statement failed");
                    QueryError::Sql(e)
                })?;
            total.last_insert_id = result.last_insert_id();
            total.rows_affected += result.rows_affected();
        }

        Ok(total)
    }

    pub async fn insert(&self, query: &Query, record: &Record) -> Result<ExecResult> {
        let (sql, params) = query.build_insert(record)?;
        self.exec(&sql, &params).await
    }

    pub async fn tx_insert(&self, query: &Query, record: &Record) -> Result<ExecResult> {
        let (sql, params) = query.build_insert(record)?;
        self.tx_exec(&sql, &params).await
    }

    /// Insert several records with one prepared statement
    pub async fn insert_many(&self, query: &Query, records: &[Record]) -> Result<ExecResult> {
        let (sql, rows) = query.build_insert_many(records)?;
        self.exec_batch(&sql, &rows).await
    }

    pub async fn update(&self, query: &Query, record: &Record) -> Result<ExecResult> {
        let (sql, params) = query.build_update(record)?;
        self.exec(&sql, &params).await
    }

    pub async fn tx_update(&self, query: &Query, record: &Record) -> Result<ExecResult> {
        let (sql, params) = query.build_update(record)?;
        self.tx_exec(&sql, &params).await
    }

    pub async fn update_many(&self, query: &Query, records: &[Record]) -> Result<ExecResult> {
        let (sql, rows) = query.build_update_many(records)?;
        self.exec_batch(&sql, &rows).await
    }

    pub async fn delete(&self, query: &Query) -> Result<ExecResult> {
        let (sql, params) = query.build_delete()?;
        self.exec(&sql, &params).await
    }

    pub async fn tx_delete(&self, query: &Query) -> Result<ExecResult> {
        let (sql, params) = query.build_delete()?;
        self.tx_exec(&sql, &params).await
    }

    // =========================================================================
    // DDL
    // =========================================================================

    /// Run a statement outside the prepared statement protocol
    async fn exec_raw(&self, sql: &str) -> Result<ExecResult> {
        self.log_statement(sql, 0);
        let result = sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(result.into())
    }

    /// `USE <name>` on whichever pooled connection runs it
    pub async fn use_database(&self, name: &str) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().use_database(name)).await
    }

    /// `SET NAMES` on whichever pooled connection runs it
    pub async fn set_names(&self, charset: &str) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().set_names(charset)?).await
    }

    pub async fn create_database(&self, name: &str, charset: &str) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().create_database(name, charset)?)
            .await
    }

    pub async fn drop_database(&self, name: &str) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().drop_database(name)).await
    }

    pub async fn drop_table(&self, table: &str) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().drop_table(table)).await
    }

    pub async fn alter_database_charset(&self, name: &str, charset: &str) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().alter_database_charset(name, charset)?)
            .await
    }

    pub async fn alter_table_charset(&self, table: &str, charset: &str) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().alter_table_charset(table, charset)?)
            .await
    }

    pub async fn add_column(&self, table: &str, column: &str, definition: &str) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().add_column(table, column, definition))
            .await
    }

    pub async fn modify_column(
        &self,
        table: &str,
        column: &str,
        definition: &str,
    ) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().modify_column(table, column, definition))
            .await
    }

    pub async fn auto_increment(&self, table: &str, value: u64) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().auto_increment(table, value)).await
    }

    pub async fn truncate(&self, table: &str) -> Result<ExecResult> {
        self.exec_raw(&self.ddl().truncate(table)).await
    }
}

/// Render a value the way scalar results are printed
///
/// Strings come out unquoted and NULL becomes an empty string.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

fn bind_params<'q>(mut query: MySqlQuery<'q>, params: &[Value]) -> MySqlQuery<'q> {
    for param in params {
        query = bind_param(query, param);
    }
    query
}

fn bind_param<'q>(query: MySqlQuery<'q>, value: &Value) -> MySqlQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

fn row_to_record(row: &MySqlRow) -> Record {
    let mut record = Record::new();
    for column in row.columns() {
        let value = extract_column_value(row, column.ordinal(), column.type_info().name());
        record.insert(column.name().to_string(), value);
    }
    record
}

fn extract_column_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let value = match type_name {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::from),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(Value::from),
        "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "DECIMAL" => row
            .try_get::<Option<rust_decimal::Decimal>, _>(index)
            .ok()
            .flatten()
            .map(|d| Value::String(d.to_string())),
        "DATETIME" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string())),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string())),
        "JSON" => row.try_get::<Option<Value>, _>(index).ok().flatten(),
        _ => None,
    };

    value.unwrap_or_else(|| extract_text(row, index))
}

fn extract_text(row: &MySqlRow, index: usize) -> Value {
    if let Ok(Some(text)) = row.try_get::<Option<String>, _>(index) {
        return Value::String(text);
    }
    row.try_get::<Option<Vec<u8>>, _>(index)
        .ok()
        .flatten()
        .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        .unwrap_or(Value::Null)
}
