//! "Current active adapter" slot.
//!
//! Prefer handing adapters to callers explicitly. This slot exists for hosts
//! that look the adapter up from a single well-known place.

use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::adapter::DatabaseAdapter;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no active adapter is registered")]
    NoActiveAdapter,
}

#[derive(Default)]
struct Slot {
    active: Option<Arc<dyn DatabaseAdapter>>,
    intercepted: bool,
}

/// Holds the active adapter and remembers whether an interceptor was installed.
#[derive(Default)]
pub struct AdapterRegistry {
    slot: RwLock<Slot>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapter(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        let registry = Self::new();
        registry.set(adapter);
        registry
    }

    pub fn get(&self) -> Option<Arc<dyn DatabaseAdapter>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .clone()
    }

    /// Replace the active adapter. Any installed interceptor is dropped with it.
    pub fn set(&self, adapter: Arc<dyn DatabaseAdapter>) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.active = Some(adapter);
        slot.intercepted = false;
    }

    pub fn is_intercepted(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .intercepted
    }

    /// Wrap the active adapter with `wrap`, at most once.
    ///
    /// Returns `Ok(false)` without calling `wrap` when an interceptor is
    /// already installed.
    pub fn install_interceptor<E, F>(&self, wrap: F) -> Result<bool, E>
    where
        E: From<RegistryError>,
        F: FnOnce(Arc<dyn DatabaseAdapter>) -> Result<Arc<dyn DatabaseAdapter>, E>,
    {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.intercepted {
            return Ok(false);
        }

        let current = slot.active.clone().ok_or(RegistryError::NoActiveAdapter)?;
        slot.active = Some(wrap(current)?);
        slot.intercepted = true;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdapter;

    #[test]
    fn test_install_once() {
        let registry = AdapterRegistry::with_adapter(Arc::new(MemoryAdapter::new("mysql")));

        let installed: Result<bool, RegistryError> =
            registry.install_interceptor(|inner| Ok(inner));
        assert!(installed.unwrap());
        assert!(registry.is_intercepted());

        let again: Result<bool, RegistryError> =
            registry.install_interceptor(|_| panic!("must not wrap twice"));
        assert!(!again.unwrap());
    }

    #[test]
    fn test_install_without_adapter_fails() {
        let registry = AdapterRegistry::new();
        let result: Result<bool, RegistryError> = registry.install_interceptor(|inner| Ok(inner));
        assert!(matches!(result, Err(RegistryError::NoActiveAdapter)));
        assert!(!registry.is_intercepted());
    }

    #[test]
    fn test_set_resets_interception() {
        let registry = AdapterRegistry::with_adapter(Arc::new(MemoryAdapter::new("mysql")));
        let _: Result<bool, RegistryError> = registry.install_interceptor(|inner| Ok(inner));

        registry.set(Arc::new(MemoryAdapter::new("postgresql")));
        assert!(!registry.is_intercepted());
        assert_eq!(registry.get().unwrap().adapter_name(), "postgresql");
    }
}
