//! Shared types for the query-log crates.
//!
//! Holds the per-call context a caller passes to every adapter operation
//! (call-site trace plus optional request context) and the configuration
//! types loaded at setup time.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;

pub use config::{
    ConfigError, FailurePolicy, FilterMatrix, LogDatabaseConfig, MatrixEntry, QueryLogConfig,
};

/// Identifies which logical component and operation initiated a call.
///
/// The pair is the key the call-site filter matches against, by exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    /// Component or class name, e.g. `"Users"`.
    pub group: String,
    /// Operation within the group, e.g. `"create"`.
    pub operation: String,
}

impl CallSite {
    pub fn new(group: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            operation: operation.into(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.group, self.operation)
    }
}

/// Ambient HTTP request data for the call, if the call happens inside a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Correlation id of the logical request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl RequestContext {
    pub fn new(uri: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            request_id: None,
            uri: Some(uri.into()),
            method: Some(method.into()),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Per-call context passed explicitly to every adapter operation.
///
/// `trace` is ordered innermost-first: the first entry is the call site that
/// invoked the adapter operation directly, later entries are its callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    trace: Vec<CallSite>,
    request: Option<RequestContext>,
}

impl CallContext {
    /// Context for a call made directly from `site`.
    pub fn new(site: CallSite) -> Self {
        Self {
            trace: vec![site],
            request: None,
        }
    }

    /// Shorthand for `CallContext::new(CallSite::new(group, operation))`.
    pub fn at(group: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::new(CallSite::new(group, operation))
    }

    /// Context for a call made from `site`, which itself was called from `self`.
    pub fn enter(&self, site: CallSite) -> Self {
        let mut trace = Vec::with_capacity(self.trace.len() + 1);
        trace.push(site);
        trace.extend(self.trace.iter().cloned());
        Self {
            trace,
            request: self.request.clone(),
        }
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    /// The call site that invoked the adapter directly.
    pub fn caller(&self) -> Option<&CallSite> {
        self.trace.first()
    }

    pub fn trace(&self) -> &[CallSite] {
        &self.trace
    }

    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_ref()
    }
}
