//! Authenticated client for the primary backend.
//!
//! DESIGN
//! ======
//! Every request goes through two interceptors:
//! - request: tag the request with the session epoch and attach
//!   `Authorization: Bearer <token>` when the session holds a valid token.
//!   Tag and token are read in one step, so a request can never carry one
//!   session's token under another session's tag.
//! - response: a 401 invalidates the session it was dispatched under, then
//!   the rejection is still returned to the caller. Any response arriving
//!   after the session changed is discarded.
//!
//! The OCR backend has its own client (`api::ocr`) with neither interceptor.

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::{ApiError, Envelope};
use crate::config::HttpTimeouts;
use crate::session::{InvalidationCause, SessionStore};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Build a client for `base_url` (e.g. `http://localhost:3000/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeouts: HttpTimeouts, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned(), session })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Start a request to `path`, relative to the base URL.
    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, endpoint_url(&self.base_url, path))
    }

    /// Send through both interceptors. Non-success statuses become errors.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on 401 (after the session was invalidated),
    /// `SessionChanged` when the session moved on mid-flight, `ApiResponse`
    /// for other failure statuses, `ApiRequest` for transport errors.
    pub async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let mut request = builder.build().map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        let dispatch_epoch = self.authenticate(&mut request);

        debug!(method = %request.method(), url = %request.url(), dispatch_epoch, "api request");
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;

        self.intercept_response(response, dispatch_epoch).await
    }

    /// Send and parse the JSON body as `T`.
    ///
    /// # Errors
    ///
    /// As `send`, plus `ApiParse` when the body does not match `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        parse_json(&text)
    }

    /// `GET path` and unwrap the `{ data }` envelope.
    ///
    /// # Errors
    ///
    /// As `send_json`.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.send_json(self.request(Method::GET, path)).await?;
        Ok(envelope.data)
    }

    /// `method path` with a JSON body, unwrapping the `{ data }` envelope.
    ///
    /// # Errors
    ///
    /// As `send_json`.
    pub async fn json_data<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let envelope: Envelope<T> = self.send_json(self.request(method, path).json(body)).await?;
        Ok(envelope.data)
    }

    /// Request interceptor. Returns the epoch the request was tagged with.
    fn authenticate(&self, request: &mut reqwest::Request) -> u64 {
        let (epoch, token) = self.session.dispatch_credentials();
        if let Some(token) = token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    request.headers_mut().insert(AUTHORIZATION, value);
                }
                Err(e) => warn!(error = %e, "token is not a valid header value; sending unauthenticated"),
            }
        }
        epoch
    }

    /// Response interceptor.
    async fn intercept_response(
        &self,
        response: reqwest::Response,
        dispatch_epoch: u64,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            self.session
                .invalidate(InvalidationCause::Unauthorized, Some(dispatch_epoch));
            return Err(ApiError::Unauthorized { body });
        }

        if self.session.epoch() != dispatch_epoch {
            debug!(dispatch_epoch, "discarding response from a previous session");
            return Err(ApiError::SessionChanged);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::ApiResponse { status: status.as_u16(), body });
        }

        Ok(response)
    }
}

/// Join `base` and `path` with exactly one `/`.
pub(crate) fn endpoint_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub(crate) fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::ApiParse(e.to_string()))
}
