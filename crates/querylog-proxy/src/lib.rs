//! # querylog-proxy
//!
//! A decorator that sits in front of any [`DatabaseAdapter`], audits every
//! statement it runs and leaves the statement's own outcome untouched.
//!
//! ## Architecture
//!
//! ```text
//! caller
//!   │  operation(ctx, query, params)
//!   ▼
//! ┌──────────────────────┐
//! │ QueryLogAdapter      │
//! │ 1. time the call     │ ← wrapped adapter
//! │ 2. filter call site  │ ← querylog-audit::filter
//! │ 3. build record      │ ← querylog-audit::record
//! │ 4. persist record    │ ← log-store adapter
//! │ 5. return / re-raise │
//! └──────────────────────┘
//! ```
//!
//! The delegate's error always reaches the caller unchanged. A failed audit
//! write is reported through `tracing` and the proxy's counters, and only
//! fails a successful call under [`FailurePolicy::Fatal`].
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use querylog_core::{CallContext, QueryLogConfig};
//! use querylog_proxy::QueryLog;
//! use querylog_runtime::{DatabaseAdapter, MemoryAdapter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = QueryLogConfig::from_file("query-log.yaml")?;
//! let log_store: Arc<dyn DatabaseAdapter> = Arc::new(MemoryAdapter::new("postgresql"));
//! let primary: Arc<dyn DatabaseAdapter> = Arc::new(MemoryAdapter::new("postgresql"));
//!
//! let query_log = QueryLog::new(config)?.with_log_store(log_store)?;
//! let db = query_log.wrap(primary, None)?;
//!
//! db.execute(&CallContext::at("Users", "create"), "INSERT INTO users DEFAULT VALUES", &[])
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`DatabaseAdapter`]: querylog_runtime::DatabaseAdapter
//! [`FailurePolicy::Fatal`]: querylog_core::FailurePolicy::Fatal

pub mod error;
pub mod proxy;
pub mod query_log;

pub use error::ProxyError;
pub use proxy::{AuditOutcome, ProxyStats, QueryLogAdapter};
pub use query_log::QueryLog;
