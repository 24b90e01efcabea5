//! Error types for the audit crate.

use querylog_runtime::AdapterError;
use thiserror::Error;

/// Errors that can occur while building or persisting audit records.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The log store rejected the record.
    #[error("failed to persist audit record: {0}")]
    PersistFailed(#[from] AdapterError),

    /// The log-store adapter speaks a dialect the recorder cannot write.
    #[error("unsupported log-store adapter '{0}'")]
    UnsupportedAdapter(String),

    /// Invalid table or schema identifier.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
