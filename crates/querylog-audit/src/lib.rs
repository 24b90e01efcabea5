//! # querylog-audit
//!
//! Everything the query-log proxy needs to turn one delegated adapter call
//! into one persisted audit record:
//!
//! - [`id`]: random correlation identifiers (UUID v4)
//! - [`filter`]: the call-site filter deciding log vs. suppress
//! - [`record`]: the immutable [`QueryLogRecord`] and its builder
//! - [`encoding`]: the canonical text encoding of parameters and payloads
//! - [`recorder`]: persistence of records through a log-store adapter
//!
//! ## Persisted row layout
//!
//! | column | content |
//! |--------|---------|
//! | `request_id` | correlation id |
//! | `query` | statement text, verbatim |
//! | `parameters` | canonical JSON array of the statement parameters |
//! | `start_timestamp` | epoch seconds when the call started |
//! | `duration` | whole seconds the call took |
//! | `function` | calling operation, or the adapter operation if untagged |
//! | `URI` | request URI |
//! | `method` | request method |
//! | `additional_parameters` | canonical JSON of the proxy's payload |
//! | `call_trace` | JSON array of call sites, innermost first, led by the invoked adapter operation |
//! | `user_id` | current actor |
//! | `exception` | JSON failure description |

pub mod encoding;
pub mod error;
pub mod filter;
pub mod id;
pub mod record;
pub mod recorder;

pub use error::AuditError;
pub use filter::{Decision, decide};
pub use record::{FailureInfo, QueryLogRecord, QueryLogRecordBuilder};
pub use recorder::{AdapterRecorder, ConsoleRecorder, Dialect, Recorder};
