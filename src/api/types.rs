//! Wire types for the primary and OCR backends, plus the API error type.
//!
//! Server records keep every field they were sent with (`extra`), so values
//! this client does not model survive a round trip through storage.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request could not be built or sent.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The backend rejected the credential.
    #[error("unauthorized")]
    Unauthorized { body: String },

    /// The backend returned a non-success status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// A required field was absent from an otherwise valid response.
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),

    /// The session changed while the request was in flight; the response
    /// was discarded.
    #[error("session changed while request was in flight")]
    SessionChanged,
}

impl ApiError {
    /// HTTP status carried by the error, if the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::ApiResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The backend's own `message` field from an error body.
    #[must_use]
    pub fn server_message(&self) -> Option<String> {
        let body = match self {
            Self::Unauthorized { body } | Self::ApiResponse { body, .. } => body,
            _ => return None,
        };
        let parsed: Value = serde_json::from_str(body).ok()?;
        parsed
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_owned)
    }

    /// Message suitable for showing to a user: the backend's message when it
    /// sent one, `fallback` otherwise.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or_else(|| fallback.to_owned())
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Standard primary-backend response wrapper: `{ data, message?, pagination? }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { total: 0, page: 1, limit: 10, pages: 1 }
    }
}

/// A page of records with its pagination block.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(rename = "fullName")]
    pub full_name: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Server-side user profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "fullName", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Record id: `_id`, falling back to `id`.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.object_id.as_deref().or(self.id.as_deref())
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Category id, or the populated category record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_content: Option<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Filters for `GET /documents`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Sent as a comma-separated list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl DocumentQuery {
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = tags
            .into_iter()
            .map(|t| t.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(",");
        self.tags = (!joined.is_empty()).then_some(joined);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchQuery<'a> {
    pub q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Result of server-side OCR on a stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    pub ocr_content: String,
    pub ocr_language: Option<String>,
    pub ocr_confidence: Option<f64>,
}

impl OcrResult {
    /// Shape a `POST /documents/{id}/ocr` body. The payload sits under
    /// `data` or at the root.
    ///
    /// # Errors
    ///
    /// Returns `MissingField("ocrContent")` when no OCR text was returned.
    pub fn from_body(body: &Value) -> Result<Self, ApiError> {
        let data = body.get("data").filter(|d| d.is_object()).unwrap_or(body);
        let ocr_content = data
            .get("ocrContent")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(ApiError::MissingField("ocrContent"))?
            .to_owned();
        Ok(Self {
            ocr_content,
            ocr_language: data
                .get("ocrLanguage")
                .and_then(Value::as_str)
                .map(str::to_owned),
            ocr_confidence: data.get("ocrConfidence").and_then(Value::as_f64),
        })
    }
}

// =============================================================================
// CATEGORIES + TAGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTag<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'a str>,
}

// =============================================================================
// FOLDERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /folders` payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderListing {
    #[serde(default)]
    pub root_folder: Option<Folder>,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// `GET /folders/{id}/hierarchy` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderHierarchy {
    pub folder: Folder,
    #[serde(default)]
    pub subfolders: Vec<Folder>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFolder<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub parent: Option<&'a str>,
}

// =============================================================================
// STATS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub total_documents: u64,
    pub total_views: u64,
    pub total_downloads: u64,
    pub total_categories: u64,
    pub documents_by_category: Vec<CategoryStats>,
    pub recent_documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryStats {
    pub category_id: String,
    pub category_name: String,
    pub count: u64,
}

// =============================================================================
// UPLOADS
// =============================================================================

/// A file attached to a multipart request.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), content_type: None, bytes }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Build a multipart form with this file under `file` plus text `fields`.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is not a valid MIME string.
    pub fn into_form(self, fields: &[(&str, &str)]) -> Result<reqwest::multipart::Form, ApiError> {
        let mut part = reqwest::multipart::Part::bytes(self.bytes).file_name(self.file_name);
        if let Some(content_type) = self.content_type {
            part = part
                .mime_str(&content_type)
                .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        }
        let form = fields
            .iter()
            .fold(reqwest::multipart::Form::new(), |form, (k, v)| {
                form.text((*k).to_owned(), (*v).to_owned())
            });
        Ok(form.part("file", part))
    }
}
