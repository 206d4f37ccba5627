//! Route guard for protected views.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs before every transition, including the very first one after start-up.
//! It reads the token straight from durable storage instead of the session
//! store so it is correct even before the store has been initialized.
//!
//! TRADE-OFFS
//! ==========
//! Expiry is checked locally from the token's own claim; no network call is
//! made here. The backend still rejects bad tokens on every request.

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

use std::sync::Arc;

use tracing::{info, warn};

use crate::routes::{self, Location};
use crate::storage::{DurableStorage, TOKEN_KEY, USER_KEY};
use crate::token;

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Location),
}

pub struct RouteGuard {
    storage: Arc<dyn DurableStorage>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    /// Decide whether the transition to `to` may proceed.
    ///
    /// A protected target without a valid persisted token is redirected to
    /// login with the original path as the redirect target, and the stale
    /// session entries are cleared.
    #[must_use]
    pub fn check(&self, to: &Location) -> GuardDecision {
        if !routes::requires_auth(&to.path) {
            return GuardDecision::Proceed;
        }

        let stored = self.storage.get(TOKEN_KEY).unwrap_or_else(|e| {
            warn!(error = %e, "guard could not read token; treating as logged out");
            None
        });
        if !token::is_expired(stored.as_deref()) {
            return GuardDecision::Proceed;
        }

        if stored.is_some() {
            self.clear_stale_session();
        }
        let target = to.full_path();
        info!(target = %target, "protected route requires login");
        GuardDecision::Redirect(Location::login_with_redirect(&target))
    }

    fn clear_stale_session(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "guard could not clear stale session entry");
            }
        }
    }
}
