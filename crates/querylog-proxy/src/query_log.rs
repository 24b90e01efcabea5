//! Setup facade: turns a [`QueryLogConfig`] into installed interception.

use querylog_audit::{AdapterRecorder, AuditError, Dialect, Recorder};
use querylog_core::{FilterMatrix, QueryLogConfig};
use querylog_runtime::{AdapterRegistry, AnonymousIdentity, DatabaseAdapter, IdentityProvider};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ProxyError;
use crate::proxy::QueryLogAdapter;

/// Query logging for one deployment.
///
/// Holds the validated configuration and the recorder shared by every proxy
/// it creates. When the configuration is disabled, wrapping and registering
/// are no-ops and no log store is needed.
pub struct QueryLog {
    config: QueryLogConfig,
    matrix: Arc<FilterMatrix>,
    recorder: Option<Arc<dyn Recorder>>,
    identity: Arc<dyn IdentityProvider>,
}

impl QueryLog {
    /// Validate `config` and prepare a facade without a log store yet.
    pub fn new(config: QueryLogConfig) -> Result<Self, ProxyError> {
        config.validate()?;
        let matrix = Arc::new(config.matrix.clone());

        Ok(Self {
            config,
            matrix,
            recorder: None,
            identity: Arc::new(AnonymousIdentity),
        })
    }

    /// Write records through `store` into the configured log table.
    ///
    /// The store's driver must be one the recorder can write to and must
    /// match the configured `database.adapter`.
    pub fn with_log_store(mut self, store: Arc<dyn DatabaseAdapter>) -> Result<Self, ProxyError> {
        if self.config.disabled {
            return Ok(self);
        }

        let database = self.config.database()?;
        let configured = Dialect::from_adapter_name(&database.adapter).ok_or_else(|| {
            ProxyError::CapabilityMismatch(format!(
                "unsupported log-store adapter '{}'",
                database.adapter
            ))
        })?;
        let actual = Dialect::from_adapter_name(store.adapter_name());
        if actual != Some(configured) {
            return Err(ProxyError::CapabilityMismatch(format!(
                "log store is '{}' but configuration expects '{}'",
                store.adapter_name(),
                database.adapter
            )));
        }

        let recorder = AdapterRecorder::from_config(store, database).map_err(|err| match err {
            AuditError::UnsupportedAdapter(name) => {
                ProxyError::CapabilityMismatch(format!("unsupported log-store adapter '{}'", name))
            }
            other => ProxyError::Configuration(other.to_string()),
        })?;

        tracing::info!(
            adapter = %database.adapter,
            table = %database.table,
            "Query log store ready"
        );
        self.recorder = Some(Arc::new(recorder));
        Ok(self)
    }

    /// Use a custom recorder instead of a log-store adapter.
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.config.disabled
    }

    pub fn config(&self) -> &QueryLogConfig {
        &self.config
    }

    /// Build a typed proxy around `inner`.
    ///
    /// `additional_parameters` overrides the configured payload when given.
    pub fn proxy(
        &self,
        inner: Arc<dyn DatabaseAdapter>,
        additional_parameters: Option<Value>,
    ) -> Result<QueryLogAdapter, ProxyError> {
        if self.config.disabled {
            return Err(ProxyError::Configuration(
                "query-log is disabled".to_string(),
            ));
        }
        let recorder = self.recorder.clone().ok_or_else(|| {
            ProxyError::Configuration("no log store configured for query-log".to_string())
        })?;

        let payload = additional_parameters.or_else(|| self.config.additional_parameters.clone());

        Ok(QueryLogAdapter::new(inner, recorder)
            .with_matrix(self.matrix.clone())
            .with_identity(self.identity.clone())
            .with_additional_parameters(payload)
            .with_failure_policy(self.config.failure_policy))
    }

    /// Wrap `inner`, or hand it back untouched when query logging is disabled.
    pub fn wrap(
        &self,
        inner: Arc<dyn DatabaseAdapter>,
        additional_parameters: Option<Value>,
    ) -> Result<Arc<dyn DatabaseAdapter>, ProxyError> {
        if self.config.disabled {
            return Ok(inner);
        }
        Ok(Arc::new(self.proxy(inner, additional_parameters)?))
    }

    /// Wrap the registry's active adapter.
    ///
    /// Returns `Ok(true)` when a proxy was installed and `Ok(false)` when
    /// logging is disabled or an interceptor is already in place. Nothing
    /// changes on error.
    pub fn register(
        &self,
        registry: &AdapterRegistry,
        additional_parameters: Option<Value>,
    ) -> Result<bool, ProxyError> {
        if self.config.disabled {
            tracing::debug!("Query log disabled; not registering");
            return Ok(false);
        }

        let installed =
            registry.install_interceptor(|inner| self.wrap(inner, additional_parameters))?;
        if installed {
            tracing::info!("Query log interceptor installed");
        } else {
            tracing::debug!("Query log interceptor already installed");
        }
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querylog_core::LogDatabaseConfig;
    use querylog_runtime::MemoryAdapter;

    fn config(adapter: &str) -> QueryLogConfig {
        QueryLogConfig {
            database: Some(LogDatabaseConfig {
                adapter: adapter.to_string(),
                name: "audit".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_database_is_configuration_error() {
        let result = QueryLog::new(QueryLogConfig::default());
        assert!(matches!(result, Err(ProxyError::Configuration(_))));
    }

    #[test]
    fn test_disabled_needs_no_store() {
        let config = QueryLogConfig {
            disabled: true,
            ..Default::default()
        };
        let query_log = QueryLog::new(config).unwrap();
        assert!(query_log.is_disabled());

        let inner: Arc<dyn DatabaseAdapter> = Arc::new(MemoryAdapter::new("mysql"));
        let wrapped = query_log.wrap(inner.clone(), None).unwrap();
        assert!(Arc::ptr_eq(&inner, &wrapped));
    }

    #[test]
    fn test_store_must_match_configured_adapter() {
        let query_log = QueryLog::new(config("postgresql")).unwrap();
        let result = query_log.with_log_store(Arc::new(MemoryAdapter::new("mysql")));
        assert!(matches!(result, Err(ProxyError::CapabilityMismatch(_))));
    }

    #[test]
    fn test_unsupported_store_adapter() {
        let query_log = QueryLog::new(config("sqlite")).unwrap();
        let result = query_log.with_log_store(Arc::new(MemoryAdapter::new("sqlite")));
        assert!(matches!(result, Err(ProxyError::CapabilityMismatch(_))));
    }

    #[test]
    fn test_proxy_requires_store() {
        let query_log = QueryLog::new(config("mysql")).unwrap();
        let result = query_log.proxy(Arc::new(MemoryAdapter::new("mysql")), None);
        assert!(matches!(result, Err(ProxyError::Configuration(_))));
    }
}
