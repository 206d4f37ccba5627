//! Shared application context.
//!
//! DESIGN
//! ======
//! `AppContext` replaces module-level singletons: it builds every component
//! once, in dependency order, and hands out `Arc`s.
//!
//!   storage -> guard + router -> session (reads storage) -> API clients
//!           -> auth service
//!
//! The validity checker is started separately by the shell, after the
//! session has been initialized, so it never observes a half-built context.

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

use std::sync::Arc;

use tracing::info;

use crate::api::types::ApiError;
use crate::api::{ApiClient, OcrClient};
use crate::auth::AuthService;
use crate::config::{AppConfig, ConfigError};
use crate::guard::RouteGuard;
use crate::router::Router;
use crate::session::SessionStore;
use crate::storage::{DurableStorage, FileStorage, StorageError};
use crate::validator::{ValidityCheckHandle, start_token_validity_check};

/// Startup failures surfaced to the shell.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub storage: Arc<dyn DurableStorage>,
    pub router: Arc<Router>,
    pub session: Arc<SessionStore>,
    pub api: Arc<ApiClient>,
    pub ocr: Arc<OcrClient>,
    pub auth: Arc<AuthService>,
}

impl AppContext {
    /// Build the context on top of the file-backed store at
    /// `config.storage_path`.
    ///
    /// # Errors
    ///
    /// Storage that cannot be opened, or HTTP clients that cannot be built.
    pub fn build(config: AppConfig) -> Result<Self, AppError> {
        let storage = Arc::new(FileStorage::open(&config.storage_path)?);
        info!(path = %storage.path().display(), "session storage opened");
        Self::with_storage(config, storage)
    }

    /// Build the context on an explicit storage backend.
    ///
    /// # Errors
    ///
    /// HTTP clients that cannot be built.
    pub fn with_storage(config: AppConfig, storage: Arc<dyn DurableStorage>) -> Result<Self, AppError> {
        let router = Arc::new(Router::new(RouteGuard::new(Arc::clone(&storage))));
        let session = Arc::new(SessionStore::new(
            Arc::clone(&storage),
            router.clone(),
            config.profile_policy,
        ));
        let api = Arc::new(ApiClient::new(&config.api_url, config.timeouts, Arc::clone(&session))?);
        let ocr = Arc::new(OcrClient::new(&config.ocr_api_url, config.timeouts)?);
        let auth = Arc::new(AuthService::new(Arc::clone(&api)));

        Ok(Self { config, storage, router, session, api, ocr, auth })
    }

    /// Start the periodic token check at the configured interval.
    #[must_use = "dropping the handle detaches the check; keep it to cancel on shutdown"]
    pub fn start_validity_check(&self) -> ValidityCheckHandle {
        start_token_validity_check(Arc::clone(&self.session), self.config.token_check_interval)
    }
}
