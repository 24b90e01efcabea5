//! The auditing adapter proxy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use querylog_audit::{AuditError, Decision, FailureInfo, QueryLogRecord, Recorder, decide, id};
use querylog_core::{CallContext, FailurePolicy, FilterMatrix};
use querylog_runtime::{
    AdapterError, AnonymousIdentity, DatabaseAdapter, IdentityProvider, Operation, Row,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// What happened to the audit record of one call.
#[derive(Debug)]
pub enum AuditOutcome {
    /// The record was written.
    Recorded,
    /// The call site is filtered out; no record was built.
    Suppressed,
    /// The record was built but could not be written.
    Failed(AuditError),
}

/// Audit counters of one proxy instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStats {
    pub recorded: u64,
    pub suppressed: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    recorded: AtomicU64,
    suppressed: AtomicU64,
    failed: AtomicU64,
}

/// One delegated call, as seen by the audit step.
struct Call<'a> {
    operation: Operation,
    ctx: &'a CallContext,
    query: &'a str,
    params: &'a [Value],
}

impl<'a> Call<'a> {
    fn new(
        operation: Operation,
        ctx: &'a CallContext,
        query: &'a str,
        params: &'a [Value],
    ) -> Self {
        Self {
            operation,
            ctx,
            query,
            params,
        }
    }
}

/// Adapter decorator that writes an audit record for every statement.
///
/// Implements the full [`DatabaseAdapter`] contract by delegating to the
/// wrapped adapter. Callers observe exactly the delegate's results and
/// errors; only `getAdapterName` and `close` skip auditing.
///
/// Records are written before the call returns, so one caller sees its
/// records persisted in call order.
pub struct QueryLogAdapter {
    inner: Arc<dyn DatabaseAdapter>,
    recorder: Arc<dyn Recorder>,
    matrix: Arc<FilterMatrix>,
    identity: Arc<dyn IdentityProvider>,
    additional_parameters: Option<Value>,
    failure_policy: FailurePolicy,
    /// Correlation id for calls that carry no request id of their own.
    instance_id: String,
    counters: Counters,
}

impl QueryLogAdapter {
    /// Wrap `inner`, persisting records through `recorder`.
    ///
    /// Defaults: empty matrix (log everything), anonymous identity, no
    /// additional payload, best-effort failure policy.
    pub fn new(inner: Arc<dyn DatabaseAdapter>, recorder: Arc<dyn Recorder>) -> Self {
        Self {
            inner,
            recorder,
            matrix: Arc::new(FilterMatrix::default()),
            identity: Arc::new(AnonymousIdentity),
            additional_parameters: None,
            failure_policy: FailurePolicy::default(),
            instance_id: id::generate(),
            counters: Counters::default(),
        }
    }

    pub fn with_matrix(mut self, matrix: Arc<FilterMatrix>) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_additional_parameters(mut self, payload: Option<Value>) -> Self {
        self.additional_parameters = payload;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Fallback correlation id of this instance.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn stats(&self) -> ProxyStats {
        ProxyStats {
            recorded: self.counters.recorded.load(Ordering::Relaxed),
            suppressed: self.counters.suppressed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Run the delegated call, audit it, and hand back its own result.
    async fn intercept<T, F>(&self, call: Call<'_>, delegated: F) -> Result<T, AdapterError>
    where
        F: Future<Output = Result<T, AdapterError>> + Send,
        T: Send,
    {
        let started_at = Utc::now();
        let clock = Instant::now();
        let result = delegated.await;
        let duration = clock.elapsed();

        let failure = result.as_ref().err().map(FailureInfo::from_adapter_error);
        let outcome = self.audit(&call, started_at, duration, failure).await;

        match (result, outcome) {
            (Err(err), _) => Err(err),
            (Ok(_), AuditOutcome::Failed(err)) if self.failure_policy == FailurePolicy::Fatal => {
                tracing::error!(
                    operation = %call.operation,
                    error = %err,
                    "Query log write failed; failing the call"
                );
                Err(AdapterError::AuditLog(err.to_string()))
            }
            (Ok(value), _) => Ok(value),
        }
    }

    /// Filter, build and persist. Never returns an error; failures come back
    /// as [`AuditOutcome::Failed`].
    async fn audit(
        &self,
        call: &Call<'_>,
        started_at: DateTime<Utc>,
        duration: Duration,
        failure: Option<FailureInfo>,
    ) -> AuditOutcome {
        if decide(&self.matrix, call.ctx.caller()) == Decision::Suppress {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                caller = ?call.ctx.caller(),
                operation = %call.operation,
                "Query log suppressed"
            );
            return AuditOutcome::Suppressed;
        }

        let record = QueryLogRecord::builder(call.operation, call.query)
            .context(call.ctx, &self.instance_id)
            .parameters(call.params)
            .timing(started_at, duration)
            .additional_parameters(self.additional_parameters.as_ref())
            .user_id(self.identity.current_user_id(call.ctx.request()))
            .failure(failure)
            .build();

        match self.recorder.persist(&record).await {
            Ok(()) => {
                self.counters.recorded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    request_id = %record.request_id,
                    function = %record.function,
                    operation = %record.operation,
                    failed = record.is_failure(),
                    "Query log recorded"
                );
                AuditOutcome::Recorded
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    request_id = %record.request_id,
                    function = %record.function,
                    operation = %record.operation,
                    error = %err,
                    "Failed to persist query log record"
                );
                AuditOutcome::Failed(err)
            }
        }
    }
}

#[async_trait]
impl DatabaseAdapter for QueryLogAdapter {
    fn adapter_name(&self) -> &str {
        self.inner.adapter_name()
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<u64, AdapterError> {
        self.intercept(
            Call::new(Operation::Execute, ctx, query, params),
            self.inner.execute(ctx, query, params),
        )
        .await
    }

    async fn execute_last_insert_id(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<i64>, AdapterError> {
        self.intercept(
            Call::new(Operation::ExecuteLastInsertId, ctx, query, params),
            self.inner.execute_last_insert_id(ctx, query, params),
        )
        .await
    }

    async fn execute_and_fetch(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Row>, AdapterError> {
        self.intercept(
            Call::new(Operation::ExecuteAndFetch, ctx, query, params),
            self.inner.execute_and_fetch(ctx, query, params),
        )
        .await
    }

    async fn execute_and_fetch_all(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, AdapterError> {
        self.intercept(
            Call::new(Operation::ExecuteAndFetchAll, ctx, query, params),
            self.inner.execute_and_fetch_all(ctx, query, params),
        )
        .await
    }

    async fn execute_and_fetch_array(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Vec<Value>>, AdapterError> {
        self.intercept(
            Call::new(Operation::ExecuteAndFetchArray, ctx, query, params),
            self.inner.execute_and_fetch_array(ctx, query, params),
        )
        .await
    }

    async fn execute_and_fetch_all_array(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Vec<Value>>, AdapterError> {
        self.intercept(
            Call::new(Operation::ExecuteAndFetchAllArray, ctx, query, params),
            self.inner.execute_and_fetch_all_array(ctx, query, params),
        )
        .await
    }

    async fn bind_execute(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<u64, AdapterError> {
        self.intercept(
            Call::new(Operation::BindExecute, ctx, query, params),
            self.inner.bind_execute(ctx, query, params),
        )
        .await
    }

    async fn bind_execute_last_insert_id(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<i64>, AdapterError> {
        self.intercept(
            Call::new(Operation::BindExecuteLastInsertId, ctx, query, params),
            self.inner.bind_execute_last_insert_id(ctx, query, params),
        )
        .await
    }

    async fn bind_execute_and_fetch(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Option<Row>, AdapterError> {
        self.intercept(
            Call::new(Operation::BindExecuteAndFetch, ctx, query, params),
            self.inner.bind_execute_and_fetch(ctx, query, params),
        )
        .await
    }

    async fn bind_execute_and_fetch_all(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, AdapterError> {
        self.intercept(
            Call::new(Operation::BindExecuteAndFetchAll, ctx, query, params),
            self.inner.bind_execute_and_fetch_all(ctx, query, params),
        )
        .await
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querylog_runtime::MemoryAdapter;
    use std::sync::Mutex;

    /// Recorder keeping records in memory.
    #[derive(Default)]
    struct CapturingRecorder {
        records: Mutex<Vec<QueryLogRecord>>,
    }

    #[async_trait]
    impl Recorder for CapturingRecorder {
        async fn persist(&self, record: &QueryLogRecord) -> Result<(), AuditError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn setup() -> (Arc<MemoryAdapter>, Arc<CapturingRecorder>, QueryLogAdapter) {
        let inner = Arc::new(MemoryAdapter::new("postgresql"));
        let recorder = Arc::new(CapturingRecorder::default());
        let proxy = QueryLogAdapter::new(inner.clone(), recorder.clone());
        (inner, recorder, proxy)
    }

    #[tokio::test]
    async fn test_audit_outcomes() {
        let (_, recorder, proxy) = setup();
        let proxy = proxy.with_matrix(Arc::new(FilterMatrix::new().with_group("Reports", false)));

        let ctx = CallContext::at("Users", "get");
        let logged = Call::new(Operation::Execute, &ctx, "SELECT 1", &[]);
        let outcome = proxy.audit(&logged, Utc::now(), Duration::ZERO, None).await;
        assert!(matches!(outcome, AuditOutcome::Recorded));

        let ctx = CallContext::at("Reports", "list");
        let suppressed = Call::new(Operation::Execute, &ctx, "SELECT 1", &[]);
        let outcome = proxy.audit(&suppressed, Utc::now(), Duration::ZERO, None).await;
        assert!(matches!(outcome, AuditOutcome::Suppressed));

        assert_eq!(recorder.records.lock().unwrap().len(), 1);
        assert_eq!(
            proxy.stats(),
            ProxyStats {
                recorded: 1,
                suppressed: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_instance_id_is_fallback_correlation_id() {
        let (_, recorder, proxy) = setup();
        assert!(id::is_v4(proxy.instance_id()));

        proxy
            .execute(&CallContext::default(), "SELECT 1", &[])
            .await
            .unwrap();

        let records = recorder.records.lock().unwrap();
        assert_eq!(records[0].request_id, proxy.instance_id());
    }

    #[tokio::test]
    async fn test_name_and_close_are_not_audited() {
        let (inner, recorder, proxy) = setup();

        assert_eq!(proxy.adapter_name(), "postgresql");
        proxy.close().await.unwrap();

        assert!(inner.is_closed());
        assert!(recorder.records.lock().unwrap().is_empty());
        assert_eq!(proxy.stats(), ProxyStats::default());
    }
}
