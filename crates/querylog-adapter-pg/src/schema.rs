//! DDL for the query-log table.

use querylog_runtime::AdapterError;

/// Quote a generated identifier. Only ASCII alphanumerics and `_` are accepted.
fn quote_ident(ident: &str) -> anyhow::Result<String> {
    if ident.is_empty() {
        return Err(anyhow::anyhow!("empty identifier"));
    }
    if !ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(anyhow::anyhow!("invalid identifier '{}'", ident));
    }
    Ok(format!("\"{}\"", ident))
}

/// `CREATE TABLE IF NOT EXISTS` statement for the log table.
///
/// Timestamps and durations are whole seconds; every column the recorder may
/// leave empty is nullable text.
pub fn create_table_sql(schema: Option<&str>, table: &str) -> Result<String, AdapterError> {
    let target = match schema {
        Some(schema) => format!("{}.{}", quote_ident(schema)?, quote_ident(table)?),
        None => quote_ident(table)?,
    };

    Ok(format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
    "id" BIGSERIAL PRIMARY KEY,
    "request_id" TEXT NOT NULL,
    "query" TEXT NOT NULL,
    "parameters" TEXT,
    "start_timestamp" BIGINT NOT NULL,
    "duration" BIGINT NOT NULL,
    "function" TEXT NOT NULL,
    "URI" TEXT,
    "method" TEXT,
    "additional_parameters" TEXT,
    "call_trace" TEXT NOT NULL,
    "user_id" TEXT,
    "exception" TEXT
)"#,
        target
    ))
}
