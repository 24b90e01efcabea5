//! Identity lookup for the actor behind a call.

use querylog_core::RequestContext;

/// Supplies the id of the current user, if one is known.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self, request: Option<&RequestContext>) -> Option<String>;
}

/// No identity is ever known.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn current_user_id(&self, _request: Option<&RequestContext>) -> Option<String> {
        None
    }
}

/// A single fixed identity, e.g. for a worker process acting as one service account.
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub String);

impl IdentityProvider for FixedIdentity {
    fn current_user_id(&self, _request: Option<&RequestContext>) -> Option<String> {
        Some(self.0.clone())
    }
}
