//! In-process adapter that records every statement it executes.
//!
//! Useful as a log store for local development and as a scripted delegate in
//! tests: rows to return, failures to raise and artificial latency can all be
//! configured.

use async_trait::async_trait;
use querylog_core::{CallContext, CallSite};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::adapter::{AdapterError, DatabaseAdapter, Operation, Row};

/// A statement the adapter executed successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub operation: Operation,
    pub query: String,
    pub params: Vec<Value>,
    pub caller: Option<CallSite>,
}

pub struct MemoryAdapter {
    name: String,
    latency: Duration,
    rows: Vec<Row>,
    statements: Mutex<Vec<ExecutedStatement>>,
    failures: Mutex<VecDeque<AdapterError>>,
    unavailable: Mutex<Option<String>>,
    next_id: AtomicI64,
    closed: AtomicBool,
}

impl MemoryAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latency: Duration::ZERO,
            rows: Vec::new(),
            statements: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            unavailable: Mutex::new(None),
            next_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Rows returned by every fetch operation.
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Delay applied to every statement.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Raise `error` from the next statement instead of executing it.
    pub fn fail_next(&self, error: AdapterError) {
        lock(&self.failures).push_back(error);
    }

    /// Fail every statement with a connection error until reset with `None`.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        *lock(&self.unavailable) = reason.map(str::to_string);
    }

    /// Statements executed so far, in execution order.
    pub fn statements(&self) -> Vec<ExecutedStatement> {
        lock(&self.statements).clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn run(
        &self,
        operation: Operation,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<(), AdapterError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.is_closed() {
            return Err(AdapterError::Closed);
        }
        if let Some(reason) = lock(&self.unavailable).clone() {
            return Err(AdapterError::Connection(reason));
        }
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }

        tracing::trace!(adapter = %self.name, operation = %operation, "memory adapter statement");
        lock(&self.statements).push(ExecutedStatement {
            operation,
            query: query.to_string(),
            params: params.to_vec(),
            caller: ctx.caller().cloned(),
        });
        Ok(())
    }

    fn first_row(&self) -> Option<Row> {
        self.rows.first().cloned()
    }

    fn as_array(row: &Row) -> Vec<Value> {
        row.values().cloned().collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl DatabaseAdapter for MemoryAdapter {
    fn adapter_name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<u64, AdapterError> {
        self.run(Operation::Execute, ctx, query, params).await?;
        Ok(1)
    }

    async fn execute_last_insert_id(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<i64>, AdapterError> {
        self.run(Operation::ExecuteLastInsertId, ctx, query, params)
            .await?;
        Ok(Some(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn execute_and_fetch(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Row>, AdapterError> {
        self.run(Operation::ExecuteAndFetch, ctx, query, params).await?;
        Ok(self.first_row())
    }

    async fn execute_and_fetch_all(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, AdapterError> {
        self.run(Operation::ExecuteAndFetchAll, ctx, query, params)
            .await?;
        Ok(self.rows.clone())
    }

    async fn execute_and_fetch_array(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Vec<Value>>, AdapterError> {
        self.run(Operation::ExecuteAndFetchArray, ctx, query, params)
            .await?;
        Ok(self.rows.first().map(Self::as_array))
    }

    async fn execute_and_fetch_all_array(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Vec<Value>>, AdapterError> {
        self.run(Operation::ExecuteAndFetchAllArray, ctx, query, params)
            .await?;
        Ok(self.rows.iter().map(Self::as_array).collect())
    }

    async fn bind_execute(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<u64, AdapterError> {
        self.run(Operation::BindExecute, ctx, query, params).await?;
        Ok(1)
    }

    async fn bind_execute_last_insert_id(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<i64>, AdapterError> {
        self.run(Operation::BindExecuteLastInsertId, ctx, query, params)
            .await?;
        Ok(Some(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn bind_execute_and_fetch(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Row>, AdapterError> {
        self.run(Operation::BindExecuteAndFetch, ctx, query, params)
            .await?;
        Ok(self.first_row())
    }

    async fn bind_execute_and_fetch_all(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, AdapterError> {
        self.run(Operation::BindExecuteAndFetchAll, ctx, query, params)
            .await?;
        Ok(self.rows.clone())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
