//! `querylog init-table` command implementation.

use anyhow::{Context, Result};
use querylog_adapter_pg::{PostgresAdapter, create_table_sql};
use querylog_core::{CallContext, QueryLogConfig};
use querylog_runtime::DatabaseAdapter;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    let config = QueryLogConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    config.validate()?;
    let database = config.database()?;

    let ddl = create_table_sql(database.schema.as_deref(), &database.table)?;
    let store = PostgresAdapter::from_config(database).await?;
    store.execute(&CallContext::default(), &ddl, &[]).await?;
    store.close().await?;

    tracing::info!(table = %database.table, "Query log table ready");
    Ok(())
}
