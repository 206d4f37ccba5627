//! Account flows on top of the session store: login, register, profile
//! refresh, logout.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::api::types::{ApiError, LoginRequest, RegisterRequest, UserProfile};
use crate::session::{InvalidationCause, SessionStore};

/// Fallback messages when the backend sends none.
pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";

pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Exchange credentials for a token and start a session with it.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection; `user_message(LOGIN_FAILED)` gives
    /// the text to show.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let response = self
            .api
            .auth()
            .login(&LoginRequest { email, password })
            .await
            .inspect_err(|e| warn!(error = %e, "login failed"))?;
        self.session().login(&response.token, response.user.clone());
        Ok(response.user)
    }

    /// Create an account. The caller still has to log in.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection; `user_message(REGISTRATION_FAILED)`
    /// gives the text to show.
    pub async fn register(&self, email: &str, password: &str, full_name: &str) -> Result<serde_json::Value, ApiError> {
        let body = self
            .api
            .auth()
            .register(&RegisterRequest { email, password, full_name })
            .await
            .inspect_err(|e| warn!(error = %e, "registration failed"))?;
        info!("account registered");
        Ok(body)
    }

    /// Fetch the server profile and store it with the current session.
    ///
    /// A failed fetch logs out the session that issued it. If the session
    /// changed while the request was in flight, neither the profile nor the
    /// failure touches the new one.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after logging out.
    pub async fn refresh_profile(&self) -> Result<UserProfile, ApiError> {
        let epoch = self.session().epoch();
        match self.api.auth().profile().await {
            Ok(profile) => {
                self.session().update_profile(profile.clone(), epoch);
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "profile refresh failed; logging out");
                self.session()
                    .invalidate(InvalidationCause::UserLogout, Some(epoch));
                Err(e)
            }
        }
    }

    /// End the session and go to the login view.
    pub fn logout(&self) {
        self.session().logout(true);
    }
}
