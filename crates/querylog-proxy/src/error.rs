//! Error types for the proxy crate.

use querylog_core::ConfigError;
use querylog_runtime::RegistryError;
use thiserror::Error;

/// Errors raised while setting up interception.
///
/// Nothing is installed when one of these is returned.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Required query-log settings are missing or invalid.
    #[error("query-log configuration error: {0}")]
    Configuration(String),

    /// The log-store adapter cannot be used to write audit records.
    #[error("log-store adapter mismatch: {0}")]
    CapabilityMismatch(String),

    /// The active-adapter registry has nothing to wrap.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<ConfigError> for ProxyError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
