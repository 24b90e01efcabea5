//! Audit record types.
//!
//! One [`QueryLogRecord`] is built after each non-suppressed delegated call
//! completes, persisted once and dropped.

use chrono::{DateTime, Utc};
use querylog_core::{CallContext, CallSite};
use querylog_runtime::{AdapterError, Operation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::encoding;
use crate::error::AuditError;

/// Column names of the persisted row, in insertion order.
pub const COLUMNS: [&str; 12] = [
    "request_id",
    "query",
    "parameters",
    "start_timestamp",
    "duration",
    "function",
    "URI",
    "method",
    "additional_parameters",
    "call_trace",
    "user_id",
    "exception",
];

/// Group of the innermost persisted call-trace frame, which names the
/// adapter operation that was invoked.
pub const CONTRACT_GROUP: &str = "DatabaseAdapter";

/// Plain-data description of a failed delegated call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Failure category, e.g. `ConstraintViolation`.
    pub kind: String,
    pub message: String,
    /// Messages of the underlying causes, outermost first.
    pub trace: Vec<String>,
}

impl FailureInfo {
    pub fn from_adapter_error(error: &AdapterError) -> Self {
        let mut trace = Vec::new();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            trace.push(cause.to_string());
            source = cause.source();
        }

        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
            trace,
        }
    }
}

/// Audit record of one delegated call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogRecord {
    /// Correlation id of the logical request.
    pub request_id: String,

    /// Statement text, copied verbatim.
    pub query: String,

    /// Canonical encoding of the statement parameters.
    pub parameters: Option<String>,

    pub started_at: DateTime<Utc>,

    /// Elapsed time of the delegated call, from a monotonic clock.
    pub duration: Duration,

    /// Contract operation that was invoked, e.g. `bindExecuteAndFetchAll`.
    pub operation: String,

    /// Operation of the direct caller, or `operation` for untagged calls.
    pub function: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Canonical encoding of the proxy's additional payload.
    pub additional_parameters: Option<String>,

    /// Call sites that led to the call, innermost first.
    pub call_trace: Vec<CallSite>,

    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureInfo>,
}

impl QueryLogRecord {
    pub fn builder(operation: Operation, query: impl Into<String>) -> QueryLogRecordBuilder {
        QueryLogRecordBuilder::new(operation, query)
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    /// Call trace as persisted: the invoked operation, then the callers.
    pub fn persisted_trace(&self) -> Vec<CallSite> {
        let mut trace = Vec::with_capacity(self.call_trace.len() + 1);
        trace.push(CallSite::new(CONTRACT_GROUP, self.operation.clone()));
        trace.extend(self.call_trace.iter().cloned());
        trace
    }

    /// Values of the persisted row, aligned with [`COLUMNS`].
    pub fn row_values(&self) -> Result<Vec<Value>, AuditError> {
        let exception = match &self.failure {
            Some(failure) => Value::String(encoding::encode_struct(failure)?),
            None => Value::Null,
        };

        Ok(vec![
            Value::String(self.request_id.clone()),
            Value::String(self.query.clone()),
            opt_string(&self.parameters),
            Value::from(self.started_at.timestamp()),
            Value::from(self.duration.as_secs()),
            Value::String(self.function.clone()),
            opt_string(&self.uri),
            opt_string(&self.method),
            opt_string(&self.additional_parameters),
            Value::String(encoding::encode_struct(&self.persisted_trace())?),
            opt_string(&self.user_id),
            exception,
        ])
    }

    /// Format the record as a human-readable log line.
    ///
    /// Format: `[timestamp] request=... function=... duration_ms=... [query=...]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] request={} function={} operation={} duration_ms={}",
            self.started_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.request_id,
            self.function,
            self.operation,
            self.duration.as_millis(),
        );

        // Truncate long statements for console output
        let query = if self.query.len() > 100 {
            let cut = (0..=100)
                .rev()
                .find(|i| self.query.is_char_boundary(*i))
                .unwrap_or(0);
            format!("{}...", &self.query[..cut])
        } else {
            self.query.clone()
        };
        line.push_str(&format!(" query=\"{}\"", query.replace('\n', " ")));

        if let Some(ref params) = self.parameters {
            line.push_str(&format!(" params={}", params));
        }

        if let (Some(method), Some(uri)) = (&self.method, &self.uri) {
            line.push_str(&format!(" request={} {}", method, uri));
        }

        if let Some(ref user) = self.user_id {
            line.push_str(&format!(" user={}", user));
        }

        if let Some(ref failure) = self.failure {
            line.push_str(&format!(
                " error={}:\"{}\"",
                failure.kind,
                failure.message.replace('"', "'")
            ));
        }

        line
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

/// Builder for [`QueryLogRecord`].
#[derive(Debug)]
pub struct QueryLogRecordBuilder {
    record: QueryLogRecord,
}

impl QueryLogRecordBuilder {
    pub fn new(operation: Operation, query: impl Into<String>) -> Self {
        Self {
            record: QueryLogRecord {
                request_id: String::new(),
                query: query.into(),
                parameters: None,
                started_at: Utc::now(),
                duration: Duration::ZERO,
                operation: operation.as_str().to_string(),
                function: operation.as_str().to_string(),
                uri: None,
                method: None,
                additional_parameters: None,
                call_trace: Vec::new(),
                user_id: None,
                failure: None,
            },
        }
    }

    /// Take call trace, caller and request data from the call's context.
    ///
    /// The request's correlation id wins over `fallback_request_id`.
    pub fn context(mut self, ctx: &CallContext, fallback_request_id: &str) -> Self {
        if let Some(caller) = ctx.caller() {
            self.record.function = caller.operation.clone();
        }
        self.record.call_trace = ctx.trace().to_vec();

        let request = ctx.request();
        self.record.request_id = request
            .and_then(|r| r.request_id.clone())
            .unwrap_or_else(|| fallback_request_id.to_string());
        self.record.uri = request.and_then(|r| r.uri.clone());
        self.record.method = request.and_then(|r| r.method.clone());
        self
    }

    pub fn parameters(mut self, params: &[Value]) -> Self {
        self.record.parameters = Some(encoding::encode_parameters(params));
        self
    }

    pub fn timing(mut self, started_at: DateTime<Utc>, duration: Duration) -> Self {
        self.record.started_at = started_at;
        self.record.duration = duration;
        self
    }

    pub fn failure(mut self, failure: Option<FailureInfo>) -> Self {
        self.record.failure = failure;
        self
    }

    pub fn user_id(mut self, user_id: Option<String>) -> Self {
        self.record.user_id = user_id;
        self
    }

    pub fn additional_parameters(mut self, payload: Option<&Value>) -> Self {
        self.record.additional_parameters = encoding::encode_optional(payload);
        self
    }

    pub fn build(self) -> QueryLogRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querylog_core::RequestContext;
    use serde_json::json;

    #[test]
    fn test_builder_takes_caller_and_request() {
        let ctx = CallContext::at("Controller", "post")
            .enter(CallSite::new("Users", "create"))
            .with_request(RequestContext::new("/users", "POST").with_request_id("req-7"));

        let record = QueryLogRecord::builder(Operation::BindExecute, "INSERT INTO users VALUES ($1)")
            .context(&ctx, "fallback")
            .parameters(&[json!("alice")])
            .user_id(Some("u-1".to_string()))
            .build();

        assert_eq!(record.request_id, "req-7");
        assert_eq!(record.function, "create");
        assert_eq!(record.operation, "bindExecute");
        assert_eq!(record.uri.as_deref(), Some("/users"));
        assert_eq!(record.method.as_deref(), Some("POST"));
        assert_eq!(record.parameters.as_deref(), Some(r#"["alice"]"#));
        assert_eq!(record.call_trace[0], CallSite::new("Users", "create"));
        assert_eq!(record.call_trace[1], CallSite::new("Controller", "post"));
    }

    #[test]
    fn test_untagged_call_uses_fallback_and_operation_name() {
        let record = QueryLogRecord::builder(Operation::ExecuteAndFetchAll, "SELECT 1")
            .context(&CallContext::default(), "proxy-id")
            .build();

        assert_eq!(record.request_id, "proxy-id");
        assert_eq!(record.function, "executeAndFetchAll");
        assert!(record.uri.is_none());
        assert!(record.call_trace.is_empty());
    }

    #[test]
    fn test_failure_info_is_plain_data() {
        let err = AdapterError::ConstraintViolation("duplicate key value".to_string());
        let info = FailureInfo::from_adapter_error(&err);
        assert_eq!(info.kind, "ConstraintViolation");
        assert_eq!(info.message, "constraint violation: duplicate key value");
        assert!(info.trace.is_empty());
    }

    #[test]
    fn test_failure_info_flattens_causes() {
        let inner = anyhow::anyhow!("socket reset").context("read failed");
        let err = AdapterError::from(inner);
        let info = FailureInfo::from_adapter_error(&err);
        assert_eq!(info.kind, "Internal");
        assert_eq!(info.message, "read failed");
        assert_eq!(info.trace, vec!["socket reset".to_string()]);
    }

    #[test]
    fn test_row_values_layout() {
        let started_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let record = QueryLogRecord::builder(Operation::Execute, "DELETE FROM t")
            .context(&CallContext::at("Jobs", "purge"), "id-1")
            .parameters(&[])
            .timing(started_at, Duration::from_millis(2_500))
            .additional_parameters(None)
            .failure(Some(FailureInfo {
                kind: "Query".to_string(),
                message: "boom".to_string(),
                trace: vec![],
            }))
            .build();

        let values = record.row_values().unwrap();
        assert_eq!(values.len(), COLUMNS.len());
        assert_eq!(values[0], json!("id-1"));
        assert_eq!(values[2], json!("[]"));
        assert_eq!(values[3], json!(1_700_000_000i64));
        assert_eq!(values[4], json!(2));
        assert_eq!(values[5], json!("purge"));
        assert_eq!(values[6], Value::Null);
        assert_eq!(values[8], Value::Null);
        assert_eq!(
            values[9],
            json!(
                r#"[{"group":"DatabaseAdapter","operation":"execute"},{"group":"Jobs","operation":"purge"}]"#
            )
        );
        assert_eq!(values[10], Value::Null);

        let exception: FailureInfo =
            serde_json::from_str(values[11].as_str().unwrap()).unwrap();
        assert_eq!(exception.kind, "Query");
    }

    #[test]
    fn test_persisted_trace_keeps_invoked_operation() {
        let record = QueryLogRecord::builder(Operation::BindExecuteAndFetchAll, "SELECT 1")
            .context(&CallContext::at("Users", "fetch"), "id-1")
            .build();

        assert_eq!(record.function, "fetch");
        assert_eq!(
            record.persisted_trace(),
            vec![
                CallSite::new(CONTRACT_GROUP, "bindExecuteAndFetchAll"),
                CallSite::new("Users", "fetch"),
            ]
        );

        let untagged = QueryLogRecord::builder(Operation::Execute, "SELECT 1").build();
        assert_eq!(
            untagged.persisted_trace(),
            vec![CallSite::new(CONTRACT_GROUP, "execute")]
        );
    }

    #[test]
    fn test_to_log_line() {
        let record = QueryLogRecord::builder(Operation::Execute, "SELECT * FROM users")
            .context(&CallContext::at("Users", "fetch"), "id-1")
            .build();
        let line = record.to_log_line();
        assert!(line.contains("request=id-1"));
        assert!(line.contains("function=fetch"));
        assert!(line.contains("query=\"SELECT * FROM users\""));
    }
}
