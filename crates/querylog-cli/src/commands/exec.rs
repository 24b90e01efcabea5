//! `querylog exec` command implementation.

use anyhow::{Context, Result};
use querylog_adapter_pg::PostgresAdapter;
use querylog_audit::ConsoleRecorder;
use querylog_core::{CallContext, QueryLogConfig};
use querylog_proxy::QueryLog;
use querylog_runtime::{DatabaseAdapter, FixedIdentity};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
pub struct ExecArgs {
    pub url: String,
    /// `(group, operation)` of the caller, when attributed.
    pub caller: Option<(String, String)>,
    pub user: Option<String>,
    pub fetch: bool,
    pub stdout: bool,
    pub sql: String,
}

pub async fn run(config_path: &Path, args: ExecArgs) -> Result<()> {
    let config = QueryLogConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let mut query_log = QueryLog::new(config)?;
    if let Some(user) = args.user {
        query_log = query_log.with_identity(Arc::new(FixedIdentity(user)));
    }

    let mut log_store = None;
    if args.stdout {
        query_log = query_log.with_recorder(Arc::new(ConsoleRecorder));
    } else if !query_log.is_disabled() {
        let store: Arc<dyn DatabaseAdapter> =
            Arc::new(PostgresAdapter::from_config(query_log.config().database()?).await?);
        log_store = Some(store.clone());
        query_log = query_log.with_log_store(store)?;
    }

    let primary: Arc<dyn DatabaseAdapter> = Arc::new(
        PostgresAdapter::connect(&args.url)
            .await
            .context("failed to connect to the primary database")?,
    );
    let db = query_log.wrap(primary, None)?;

    let ctx = match args.caller {
        Some((group, operation)) => CallContext::at(group, operation),
        None => CallContext::default(),
    };

    if args.fetch {
        let rows = db.execute_and_fetch_all(&ctx, &args.sql, &[]).await?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let affected = db.execute(&ctx, &args.sql, &[]).await?;
        println!("{} row(s) affected", affected);
    }

    db.close().await?;
    if let Some(store) = log_store {
        store.close().await?;
    }
    Ok(())
}
