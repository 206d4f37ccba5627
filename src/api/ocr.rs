//! Client for the standalone OCR backend.
//!
//! The OCR service takes no credential. This client has its own HTTP client
//! and no handle on the session, so it can neither leak the bearer token to
//! a second origin nor end the session on a 401; its rejections are plain
//! `ApiError::ApiResponse` values.

#[cfg(test)]
#[path = "ocr_test.rs"]
mod tests;

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::client::{endpoint_url, parse_json};
use super::types::{ApiError, FileUpload};
use crate::config::HttpTimeouts;

pub struct OcrClient {
    http: reqwest::Client,
    base_url: String,
}

impl OcrClient {
    /// Build a client for `base_url` (e.g. `http://localhost:8000`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /ocr/extract`: run OCR on `file` without storing it.
    ///
    /// # Errors
    ///
    /// Transport, status, and parse failures.
    pub async fn extract(&self, file: FileUpload, language: Option<&str>) -> Result<Value, ApiError> {
        let fields: Vec<(&str, &str)> = language.map(|l| ("language", l)).into_iter().collect();
        let form = file.into_form(&fields)?;
        self.send(self.http.post(endpoint_url(&self.base_url, "/ocr/extract")).multipart(form))
            .await
    }

    /// `POST /ocr/upload-and-save`: run OCR and store the document.
    ///
    /// # Errors
    ///
    /// Transport, status, and parse failures.
    pub async fn upload_and_save(&self, file: FileUpload, fields: &[(&str, &str)]) -> Result<Value, ApiError> {
        let form = file.into_form(fields)?;
        self.send(
            self.http
                .post(endpoint_url(&self.base_url, "/ocr/upload-and-save"))
                .multipart(form),
        )
        .await
    }

    /// `GET /ocr/supported-languages`.
    ///
    /// # Errors
    ///
    /// Transport, status, and parse failures.
    pub async fn supported_languages(&self) -> Result<Value, ApiError> {
        self.send(
            self.http
                .request(Method::GET, endpoint_url(&self.base_url, "/ocr/supported-languages")),
        )
        .await
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "ocr request rejected");
            return Err(ApiError::ApiResponse { status: status.as_u16(), body: text });
        }
        parse_json(&text)
    }
}
