//! Client-side router.
//!
//! DESIGN
//! ======
//! `Router` owns the current location and a log of issued navigations. Every
//! transition passes through the `RouteGuard`. The session layer only sees
//! the `Navigator` trait, so it can issue navigations without knowing about
//! the route table.
//!
//! Redundant pushes (same location as current) are absorbed here, which is
//! what makes repeated logouts and competing invalidations harmless.

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::guard::{GuardDecision, RouteGuard};
use crate::routes::{Location, REDIRECT_PARAM};

/// Where users land after login when no redirect target was captured.
pub const DEFAULT_AFTER_LOGIN_PATH: &str = "/dashboard";

/// How a navigation is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// In-app transition; in-memory state survives.
    Push,
    /// Full reload; all in-memory state is rebuilt from durable storage.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub location: Location,
    pub mode: NavigationMode,
}

/// Navigation seam used by the session layer.
pub trait Navigator: Send + Sync {
    fn navigate(&self, to: &Location, mode: NavigationMode);
    fn current(&self) -> Option<Location>;
}

#[derive(Default)]
struct RouterState {
    current: Option<Location>,
    events: Vec<NavigationEvent>,
}

pub struct Router {
    guard: RouteGuard,
    state: Mutex<RouterState>,
}

impl Router {
    #[must_use]
    pub fn new(guard: RouteGuard) -> Self {
        Self { guard, state: Mutex::new(RouterState::default()) }
    }

    /// Push `full_path` (e.g. `/documents?page=2`) and return where the
    /// router actually landed after the guard ran.
    pub fn push(&self, full_path: &str) -> Option<Location> {
        self.navigate(&Location::parse(full_path), NavigationMode::Push);
        self.current()
    }

    /// All navigations carried out so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<NavigationEvent> {
        self.lock().events.clone()
    }

    /// Take the pending redirect target off the current login location.
    ///
    /// Returns `None` unless the router is on the login view with a
    /// same-origin (`/`-rooted) target. The parameter is consumed either way.
    pub fn take_redirect_target(&self) -> Option<String> {
        let mut state = self.lock();
        let current = state.current.as_mut().filter(|loc| loc.is_login())?;
        let idx = current.query.iter().position(|(k, _)| k == REDIRECT_PARAM)?;
        let (_, target) = current.query.remove(idx);
        (target.starts_with('/') && !target.starts_with("//")).then_some(target)
    }

    /// Leave the login view for the captured redirect target, or the
    /// dashboard when there is none.
    pub fn finish_login(&self) -> Option<Location> {
        let target = self
            .take_redirect_target()
            .unwrap_or_else(|| DEFAULT_AFTER_LOGIN_PATH.to_owned());
        self.push(&target)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for Router {
    fn navigate(&self, to: &Location, mode: NavigationMode) {
        let target = match self.guard.check(to) {
            GuardDecision::Proceed => to.clone(),
            GuardDecision::Redirect(login) => login,
        };

        let mut state = self.lock();
        if mode == NavigationMode::Push && state.current.as_ref() == Some(&target) {
            debug!(to = %target, "navigation to current location ignored");
            return;
        }
        info!(to = %target, ?mode, "navigating");
        state.current = Some(target.clone());
        state.events.push(NavigationEvent { location: target, mode });
    }

    fn current(&self) -> Option<Location> {
        self.lock().current.clone()
    }
}
