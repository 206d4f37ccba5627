//! Session store: the single authority for "is there a valid session".
//!
//! SYSTEM CONTEXT
//! ==============
//! One `SessionStore` is built per process by `AppContext` and shared as an
//! `Arc` with the API client, the validity checker, and the auth service.
//! The route guard is the only reader that bypasses it (it reads durable
//! storage directly).
//!
//! DESIGN
//! ======
//! Token and profile are one unit: both are loaded, written, and cleared
//! together, under the same lock, so no reader ever sees a token paired with
//! another session's profile. Every login and every clear bumps `epoch`;
//! requests carry the epoch they were dispatched under, and late responses
//! from an older epoch can neither invalidate nor feed the current session.
//!
//! ERROR HANDLING
//! ==============
//! Storage failures are logged and absorbed. After any operation the session
//! is either valid or fully absent.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::api::types::UserProfile;
use crate::router::{NavigationMode, Navigator};
use crate::routes::Location;
use crate::storage::{DurableStorage, TOKEN_KEY, USER_KEY};
use crate::token;

// =============================================================================
// POLICY + CAUSES
// =============================================================================

/// Which source wins when token claims and the server profile disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilePolicy {
    /// Identity comes from the token's claims.
    #[default]
    TokenClaims,
    /// Identity comes from the last profile the server returned.
    ServerProfile,
}

impl FromStr for ProfilePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(Self::TokenClaims),
            "server" => Ok(Self::ServerProfile),
            other => Err(format!("unknown profile policy '{other}' (expected 'token' or 'server')")),
        }
    }
}

/// Why a session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationCause {
    /// Explicit logout.
    UserLogout,
    /// The local expiry check found the token expired.
    Expired,
    /// The primary backend rejected the credential (HTTP 401).
    Unauthorized,
}

impl InvalidationCause {
    /// A backend rejection reloads so nothing in memory survives; the local
    /// paths stay inside the app.
    #[must_use]
    pub fn navigation_mode(self) -> NavigationMode {
        match self {
            Self::Unauthorized => NavigationMode::Reload,
            Self::UserLogout | Self::Expired => NavigationMode::Push,
        }
    }
}

// =============================================================================
// VIEWS
// =============================================================================

/// Projection of the current token's claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub exp: i64,
}

/// Identity resolved through the configured `ProfilePolicy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub source: ProfilePolicy,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<UserProfile>,
    epoch: u64,
}

pub struct SessionStore {
    storage: Arc<dyn DurableStorage>,
    navigator: Arc<dyn Navigator>,
    policy: ProfilePolicy,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Build the store and load any persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>, navigator: Arc<dyn Navigator>, policy: ProfilePolicy) -> Self {
        let (token, user) = load_persisted(storage.as_ref());
        debug!(restored = token.is_some(), "session store initialized");
        Self { storage, navigator, policy, state: RwLock::new(SessionState { token, user, epoch: 0 }) }
    }

    #[must_use]
    pub fn policy(&self) -> ProfilePolicy {
        self.policy
    }

    /// Re-read token and profile from durable storage.
    pub fn initialize_auth(&self) {
        let (token, user) = load_persisted(self.storage.as_ref());
        let mut state = self.write();
        if state.token != token {
            state.epoch += 1;
        }
        state.token = token;
        state.user = user;
    }

    /// Start a session, replacing any previous one.
    pub fn login(&self, token: &str, user: UserProfile) {
        let mut state = self.write();
        persist(self.storage.as_ref(), TOKEN_KEY, token);
        match serde_json::to_string(&user) {
            Ok(serialized) => persist(self.storage.as_ref(), USER_KEY, &serialized),
            Err(e) => warn!(error = %e, "could not serialize user profile"),
        }
        state.token = Some(token.to_owned());
        state.user = Some(user);
        state.epoch += 1;
        info!(user_id = state.user.as_ref().and_then(UserProfile::id), "session started");
    }

    /// End the session; with `should_redirect`, go to the login view.
    pub fn logout(&self, should_redirect: bool) {
        if should_redirect {
            self.invalidate(InvalidationCause::UserLogout, None);
        } else {
            self.clear_locked(&mut self.write());
            info!("session ended");
        }
    }

    /// Tear the session down and navigate to login.
    ///
    /// With `dispatch_epoch`, the call is ignored unless that epoch is still
    /// current: a trigger about an already-replaced session is stale. Storage
    /// is cleared before the navigation is issued. Returns whether the
    /// invalidation ran.
    pub fn invalidate(&self, cause: InvalidationCause, dispatch_epoch: Option<u64>) -> bool {
        {
            let mut state = self.write();
            if let Some(epoch) = dispatch_epoch.filter(|e| *e != state.epoch) {
                debug!(?cause, epoch, current = state.epoch, "stale invalidation ignored");
                return false;
            }
            self.clear_locked(&mut state);
        }
        info!(?cause, "session invalidated");
        self.navigator.navigate(&Location::login(), cause.navigation_mode());
        true
    }

    /// If a token is present and expired, log out and return `false`.
    ///
    /// The logout is tied to the epoch the expired token was read under, so a
    /// login racing with the check is never cleared by it.
    pub fn check_token_validity(&self) -> bool {
        let expired_epoch = {
            let state = self.read();
            (state.token.is_some() && token::is_expired(state.token.as_deref())).then_some(state.epoch)
        };
        let Some(epoch) = expired_epoch else {
            return true;
        };
        warn!("session token expired; logging out");
        !self.invalidate(InvalidationCause::Expired, Some(epoch))
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        let state = self.read();
        state.token.is_some() && !token::is_expired(state.token.as_deref())
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    /// Identity of the current session; bumps on every login and clear.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// The current token if it is still valid. An expired token clears the
    /// session as a side effect.
    pub fn get_valid_token(&self) -> Option<String> {
        self.dispatch_credentials().1
    }

    /// Epoch and valid token, read in one step for request tagging.
    pub fn dispatch_credentials(&self) -> (u64, Option<String>) {
        let mut state = self.write();
        match state.token.clone() {
            Some(token) if !token::is_expired(Some(&token)) => (state.epoch, Some(token)),
            Some(_) => {
                debug!("dropping expired token before dispatch");
                self.clear_locked(&mut state);
                (state.epoch, None)
            }
            None => (state.epoch, None),
        }
    }

    /// Claims view of the current token, `None` without a valid token.
    #[must_use]
    pub fn get_user_info(&self) -> Option<UserInfo> {
        let token = self.token().filter(|t| !token::is_expired(Some(t)))?;
        let claims = token::decode(&token)?;
        Some(UserInfo {
            id: claims.subject().map(str::to_owned),
            email: claims.email,
            name: claims.name,
            exp: claims.exp?,
        })
    }

    /// Current identity according to the configured policy.
    #[must_use]
    pub fn current_user(&self) -> Option<UserIdentity> {
        match self.policy {
            ProfilePolicy::TokenClaims => self.get_user_info().map(|info| UserIdentity {
                id: info.id,
                email: info.email,
                name: info.name,
                source: ProfilePolicy::TokenClaims,
            }),
            ProfilePolicy::ServerProfile => {
                if !self.is_authenticated() {
                    return None;
                }
                self.user().map(|profile| UserIdentity {
                    id: profile.id().map(str::to_owned),
                    email: profile.email.clone(),
                    name: profile.full_name.clone(),
                    source: ProfilePolicy::ServerProfile,
                })
            }
        }
    }

    /// Replace the stored profile of the session dispatched under `epoch`.
    /// Ignored when the session has changed or ended since.
    pub fn update_profile(&self, profile: UserProfile, epoch: u64) -> bool {
        let mut state = self.write();
        if state.epoch != epoch || state.token.is_none() {
            debug!(epoch, current = state.epoch, "profile update for stale session ignored");
            return false;
        }
        match serde_json::to_string(&profile) {
            Ok(serialized) => persist(self.storage.as_ref(), USER_KEY, &serialized),
            Err(e) => warn!(error = %e, "could not serialize user profile"),
        }
        state.user = Some(profile);
        true
    }

    fn clear_locked(&self, state: &mut SessionState) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "could not clear session entry");
            }
        }
        state.token = None;
        state.user = None;
        state.epoch += 1;
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn persist(storage: &dyn DurableStorage, key: &str, value: &str) {
    if let Err(e) = storage.set(key, value) {
        warn!(key, error = %e, "could not persist session entry");
    }
}

/// Load token and profile together. A profile without a token is dropped.
fn load_persisted(storage: &dyn DurableStorage) -> (Option<String>, Option<UserProfile>) {
    let token = match storage.get(TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            warn!(error = %e, "could not read persisted token; starting logged out");
            None
        }
    };

    let Some(token) = token else {
        if matches!(storage.get(USER_KEY), Ok(Some(_))) {
            debug!("dropping persisted profile without a token");
            if let Err(e) = storage.remove(USER_KEY) {
                warn!(error = %e, "could not drop orphaned profile");
            }
        }
        return (None, None);
    };

    let user = match storage.get(USER_KEY) {
        Ok(Some(raw)) => serde_json::from_str::<UserProfile>(&raw)
            .inspect_err(|e| warn!(error = %e, "persisted profile is unreadable; ignoring it"))
            .ok(),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "could not read persisted profile");
            None
        }
    };
    (Some(token), user)
}
