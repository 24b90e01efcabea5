//! # querylog-runtime
//!
//! The data-access capability contract every delegate and log-store adapter
//! implements, plus the collaborators the query-log layer consumes:
//!
//! - [`DatabaseAdapter`]: the fixed set of operations (`execute`,
//!   `executeAndFetch`, `bindExecute`, ...) with identical signatures for
//!   real adapters and for proxies wrapping them
//! - [`IdentityProvider`]: the current actor's id, if any
//! - [`AdapterRegistry`]: a "current active adapter" slot for hosts that
//!   need a singleton lookup
//! - [`MemoryAdapter`]: an in-process adapter that records every statement

pub mod adapter;
pub mod identity;
pub mod memory;
pub mod registry;

pub use adapter::{AdapterError, DatabaseAdapter, Operation, Row};
pub use identity::{AnonymousIdentity, FixedIdentity, IdentityProvider};
pub use memory::{ExecutedStatement, MemoryAdapter};
pub use registry::{AdapterRegistry, RegistryError};
