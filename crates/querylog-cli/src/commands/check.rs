//! `querylog check` command implementation.

use anyhow::{Context, Result};
use querylog_core::{MatrixEntry, QueryLogConfig};
use std::path::Path;

pub fn run(config_path: &Path) -> Result<()> {
    let config = QueryLogConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    config.validate()?;

    if config.disabled {
        println!("Query log is disabled; nothing will be recorded.");
        return Ok(());
    }

    let database = config.database()?;
    let target = match &database.schema {
        Some(schema) => format!("{}.{}", schema, database.table),
        None => database.table.clone(),
    };
    println!("Log store:      {} ({})", database.adapter, target);
    println!("Failure policy: {:?}", config.failure_policy);

    for line in describe_matrix(&config) {
        println!("{}", line);
    }
    println!("Configuration OK");
    Ok(())
}

/// One line per matrix rule; unlisted call sites are logged.
fn describe_matrix(config: &QueryLogConfig) -> Vec<String> {
    if config.matrix.is_empty() {
        return vec!["Matrix:         (empty, every call is logged)".to_string()];
    }

    let mut lines = vec!["Matrix:".to_string()];
    for (group, entry) in config.matrix.iter() {
        match entry {
            MatrixEntry::Group(log) => {
                lines.push(format!("  {}::* => {}", group, verdict(*log)));
            }
            MatrixEntry::Operations(ops) => {
                for (operation, log) in ops {
                    lines.push(format!("  {}::{} => {}", group, operation, verdict(*log)));
                }
            }
        }
    }
    lines
}

fn verdict(log: bool) -> &'static str {
    if log { "log" } else { "suppress" }
}
