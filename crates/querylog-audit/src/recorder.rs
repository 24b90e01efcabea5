//! Audit record persistence.

use async_trait::async_trait;
use querylog_core::{CallContext, LogDatabaseConfig};
use querylog_runtime::DatabaseAdapter;
use std::sync::Arc;

use crate::error::AuditError;
use crate::record::{COLUMNS, QueryLogRecord};

/// Persists audit records. One call, one write attempt.
#[async_trait]
pub trait Recorder: Send + Sync {
    async fn persist(&self, record: &QueryLogRecord) -> Result<(), AuditError>;
}

/// SQL dialect of a log-store adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    /// Map an adapter's driver name to its dialect.
    pub fn from_adapter_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pgsql" => Some(Self::Postgres),
            "mysql" | "mariadb" => Some(Self::MySql),
            _ => None,
        }
    }

    fn quote_ident(&self, ident: &str) -> String {
        match self {
            Self::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
            Self::MySql => format!("`{}`", ident.replace('`', "``")),
        }
    }

    fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            Self::MySql => "?".to_string(),
        }
    }
}

/// Writes one row per record into the log table of a log-store adapter.
pub struct AdapterRecorder {
    store: Arc<dyn DatabaseAdapter>,
    dialect: Dialect,
    statement: String,
}

impl AdapterRecorder {
    /// Create a recorder writing to `schema.table` (or just `table`).
    pub fn new(
        store: Arc<dyn DatabaseAdapter>,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Self, AuditError> {
        let dialect = Dialect::from_adapter_name(store.adapter_name())
            .ok_or_else(|| AuditError::UnsupportedAdapter(store.adapter_name().to_string()))?;

        for ident in std::iter::once(table).chain(schema) {
            if ident.is_empty() {
                return Err(AuditError::InvalidIdentifier(ident.to_string()));
            }
        }

        let statement = insert_statement(dialect, table, schema);
        tracing::debug!(statement = %statement, "Prepared query-log insert");

        Ok(Self {
            store,
            dialect,
            statement,
        })
    }

    /// Create a recorder for the table named in the log-store configuration.
    pub fn from_config(
        store: Arc<dyn DatabaseAdapter>,
        config: &LogDatabaseConfig,
    ) -> Result<Self, AuditError> {
        Self::new(store, &config.table, config.schema.as_deref())
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The INSERT statement used for every record.
    pub fn statement(&self) -> &str {
        &self.statement
    }
}

fn insert_statement(dialect: Dialect, table: &str, schema: Option<&str>) -> String {
    let target = match schema {
        Some(schema) => format!("{}.{}", dialect.quote_ident(schema), dialect.quote_ident(table)),
        None => dialect.quote_ident(table),
    };
    let columns: Vec<String> = COLUMNS.iter().map(|c| dialect.quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| dialect.placeholder(i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        target,
        columns.join(", "),
        placeholders.join(", ")
    )
}

#[async_trait]
impl Recorder for AdapterRecorder {
    async fn persist(&self, record: &QueryLogRecord) -> Result<(), AuditError> {
        let values = record.row_values()?;
        // Untagged context: the write itself is never a candidate for auditing.
        self.store
            .bind_execute(&CallContext::default(), &self.statement, &values)
            .await?;
        Ok(())
    }
}

/// Console recorder (one human-readable line per record on stdout).
#[derive(Debug, Default)]
pub struct ConsoleRecorder;

#[async_trait]
impl Recorder for ConsoleRecorder {
    async fn persist(&self, record: &QueryLogRecord) -> Result<(), AuditError> {
        println!("{}", record.to_log_line());
        Ok(())
    }
}
