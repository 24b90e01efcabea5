//! PostgreSQL implementation of the adapter contract, backed by a `sqlx`
//! connection pool. Usable both as a primary database and as a log store.

use async_trait::async_trait;
use querylog_core::{CallContext, LogDatabaseConfig};
use querylog_runtime::{AdapterError, DatabaseAdapter, Row};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Arguments, Row as _};

pub mod schema;

pub use schema::create_table_sql;

pub const ADAPTER_NAME: &str = "postgresql";

fn args_add<T>(args: &mut PgArguments, v: T) -> anyhow::Result<()>
where
    T: Send + Sync + 'static,
    for<'q> T: sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    args.add(v).map_err(|e| anyhow::anyhow!(e))
}

/// Bind positional JSON parameters.
///
/// Nulls bind as untyped text; objects and arrays bind as `jsonb`.
fn bind_params(params: &[Value]) -> Result<PgArguments, AdapterError> {
    let mut args = PgArguments::default();
    for value in params {
        match value {
            Value::Null => args_add(&mut args, Option::<String>::None)?,
            Value::Bool(b) => args_add(&mut args, *b)?,
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    args_add(&mut args, i)?;
                } else if let Some(f) = n.as_f64() {
                    args_add(&mut args, f)?;
                } else {
                    args_add(&mut args, n.to_string())?;
                }
            }
            Value::String(s) => args_add(&mut args, s.clone())?,
            other => args_add(&mut args, sqlx::types::Json(other.clone()))?,
        }
    }
    Ok(args)
}

/// Wrap a statement so each result row comes back as one `jsonb` object.
///
/// A CTE accepts both plain selects and data-modifying statements with
/// `RETURNING`.
fn json_rows_sql(query: &str) -> String {
    let query = query.trim().trim_end_matches(';');
    format!("WITH q AS ({}) SELECT to_jsonb(q) AS row FROM q", query)
}

fn map_sqlx_error(err: sqlx::Error) -> AdapterError {
    match err {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) if code.starts_with("23") => {
                AdapterError::ConstraintViolation(db.message().to_string())
            }
            Some(code) if code.starts_with("08") => {
                AdapterError::Connection(db.message().to_string())
            }
            _ => AdapterError::Query(db.message().to_string()),
        },
        sqlx::Error::PoolClosed => AdapterError::Closed,
        other @ (sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_)) => {
            AdapterError::Connection(other.to_string())
        }
        other => AdapterError::Query(other.to_string()),
    }
}

fn into_row(value: Value) -> Result<Row, AdapterError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AdapterError::Internal(anyhow::anyhow!(
            "expected a JSON object row, got {}",
            other
        ))),
    }
}

fn row_values(row: Row) -> Vec<Value> {
    row.into_iter().map(|(_, v)| v).collect()
}

pub struct PostgresAdapter {
    pool: sqlx::PgPool,
}

impl PostgresAdapter {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        tracing::debug!("Connected PostgreSQL pool");
        Ok(Self { pool })
    }

    /// Connect to the log store described by `config`.
    pub async fn from_config(config: &LogDatabaseConfig) -> anyhow::Result<Self> {
        if config.adapter != ADAPTER_NAME && config.adapter != "postgres" {
            anyhow::bail!(
                "PostgreSQL adapter cannot serve database.adapter '{}'",
                config.adapter
            );
        }
        Self::connect(&config.connection_string()).await
    }

    async fn run(&self, query: &str, params: &[Value]) -> Result<u64, AdapterError> {
        let args = bind_params(params)?;
        let done = sqlx::query_with(query, args)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(done.rows_affected())
    }

    async fn fetch_rows(&self, query: &str, params: &[Value]) -> Result<Vec<Row>, AdapterError> {
        let sql = json_rows_sql(query);
        let args = bind_params(params)?;
        let recs = sqlx::query_with(&sql, args)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut rows = Vec::with_capacity(recs.len());
        for r in recs {
            let value = r.try_get::<Value, _>("row").map_err(map_sqlx_error)?;
            rows.push(into_row(value)?);
        }
        Ok(rows)
    }

    async fn fetch_one(&self, query: &str, params: &[Value]) -> Result<Option<Row>, AdapterError> {
        Ok(self.fetch_rows(query, params).await?.into_iter().next())
    }

    /// Run the statement and read the id from its first returned column.
    ///
    /// The id has to come back through `RETURNING`. `None` when the statement
    /// returns no rows.
    async fn run_last_insert_id(
        &self,
        query: &str,
        params: &[Value],
    ) -> Result<Option<i64>, AdapterError> {
        let args = bind_params(params)?;
        let rec = sqlx::query_with(query, args)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rec.as_ref().map(first_column_id).transpose()
    }
}

fn first_column_id(row: &PgRow) -> Result<i64, AdapterError> {
    if let Ok(id) = row.try_get::<i64, _>(0) {
        return Ok(id);
    }
    if let Ok(id) = row.try_get::<i32, _>(0) {
        return Ok(i64::from(id));
    }
    row.try_get::<i16, _>(0)
        .map(i64::from)
        .map_err(map_sqlx_error)
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    fn adapter_name(&self) -> &str {
        ADAPTER_NAME
    }

    async fn execute(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<u64, AdapterError> {
        self.run(query, params).await
    }

    async fn execute_last_insert_id(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<i64>, AdapterError> {
        self.run_last_insert_id(query, params).await
    }

    async fn execute_and_fetch(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Row>, AdapterError> {
        self.fetch_one(query, params).await
    }

    async fn execute_and_fetch_all(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, AdapterError> {
        self.fetch_rows(query, params).await
    }

    async fn execute_and_fetch_array(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Vec<Value>>, AdapterError> {
        Ok(self.fetch_one(query, params).await?.map(row_values))
    }

    async fn execute_and_fetch_all_array(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Vec<Value>>, AdapterError> {
        let rows = self.fetch_rows(query, params).await?;
        Ok(rows.into_iter().map(row_values).collect())
    }

    async fn bind_execute(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<u64, AdapterError> {
        self.run(query, params).await
    }

    async fn bind_execute_last_insert_id(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<i64>, AdapterError> {
        self.run_last_insert_id(query, params).await
    }

    async fn bind_execute_and_fetch(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Row>, AdapterError> {
        self.fetch_one(query, params).await
    }

    async fn bind_execute_and_fetch_all(
        &self,
        _ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, AdapterError> {
        self.fetch_rows(query, params).await
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.pool.close().await;
        Ok(())
    }
}
