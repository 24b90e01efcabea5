use async_trait::async_trait;
use querylog_core::CallContext;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A fetched row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Errors raised by adapter operations.
///
/// A proxy hands these back to its caller exactly as the wrapped adapter
/// raised them.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A uniqueness, foreign-key or check constraint rejected the statement.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The connection to the database failed or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// The statement failed to prepare or execute.
    #[error("query error: {0}")]
    Query(String),

    /// The adapter was closed.
    #[error("adapter is closed")]
    Closed,

    /// The audit record of a successful call could not be written and the
    /// deployment treats that as fatal.
    #[error("audit log write failed: {0}")]
    AuditLog(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AdapterError {
    /// Stable name of the failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConstraintViolation(_) => "ConstraintViolation",
            Self::Connection(_) => "Connection",
            Self::Query(_) => "Query",
            Self::Closed => "Closed",
            Self::AuditLog(_) => "AuditLog",
            Self::Internal(_) => "Internal",
        }
    }
}

/// The operations of the adapter capability contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Execute,
    ExecuteLastInsertId,
    ExecuteAndFetch,
    ExecuteAndFetchAll,
    ExecuteAndFetchArray,
    ExecuteAndFetchAllArray,
    BindExecute,
    BindExecuteLastInsertId,
    BindExecuteAndFetch,
    BindExecuteAndFetchAll,
    GetAdapterName,
    Close,
}

impl Operation {
    /// Contract name of the operation, as written to audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::ExecuteLastInsertId => "executeLastInsertId",
            Self::ExecuteAndFetch => "executeAndFetch",
            Self::ExecuteAndFetchAll => "executeAndFetchAll",
            Self::ExecuteAndFetchArray => "executeAndFetchArray",
            Self::ExecuteAndFetchAllArray => "executeAndFetchAllArray",
            Self::BindExecute => "bindExecute",
            Self::BindExecuteLastInsertId => "bindExecuteLastInsertId",
            Self::BindExecuteAndFetch => "bindExecuteAndFetch",
            Self::BindExecuteAndFetchAll => "bindExecuteAndFetchAll",
            Self::GetAdapterName => "getAdapterName",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data-access capability contract.
///
/// Every operation receives the caller's [`CallContext`]. Plain adapters may
/// ignore it; proxies use it to decide whether and how to audit the call.
///
/// The `bind*` variants bind each parameter with an explicit type derived
/// from its JSON value; the plain variants let the driver infer types. For
/// drivers without that distinction both behave the same.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Lowercase driver name, e.g. `postgresql`.
    fn adapter_name(&self) -> &str;

    /// Execute a statement and return the affected row count.
    async fn execute(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<u64, AdapterError>;

    /// Execute an insert and return the generated id, if any.
    async fn execute_last_insert_id(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<i64>, AdapterError>;

    /// Execute a query and return its first row keyed by column.
    async fn execute_and_fetch(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Row>, AdapterError>;

    /// Execute a query and return all rows keyed by column.
    async fn execute_and_fetch_all(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, AdapterError>;

    /// Execute a query and return its first row as positional values.
    async fn execute_and_fetch_array(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Vec<Value>>, AdapterError>;

    /// Execute a query and return all rows as positional values.
    async fn execute_and_fetch_all_array(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Vec<Value>>, AdapterError>;

    async fn bind_execute(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<u64, AdapterError>;

    async fn bind_execute_last_insert_id(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<i64>, AdapterError>;

    async fn bind_execute_and_fetch(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Row>, AdapterError>;

    async fn bind_execute_and_fetch_all(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, AdapterError>;

    /// Close the connection.
    async fn close(&self) -> Result<(), AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Execute.as_str(), "execute");
        assert_eq!(
            Operation::BindExecuteAndFetchAll.to_string(),
            "bindExecuteAndFetchAll"
        );
        assert_eq!(Operation::GetAdapterName.as_str(), "getAdapterName");
    }

    #[test]
    fn test_error_kind() {
        let err = AdapterError::ConstraintViolation("duplicate key".to_string());
        assert_eq!(err.kind(), "ConstraintViolation");
        assert_eq!(err.to_string(), "constraint violation: duplicate key");

        let err = AdapterError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.kind(), "Internal");
        assert_eq!(err.to_string(), "boom");
    }
}
