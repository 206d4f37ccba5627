//! Typed endpoint wrappers for the primary backend.
//!
//! Each resource gets a borrowed facade over the authenticated `ApiClient`
//! (`client.documents().get(id)`), so every call here goes through the
//! bearer and 401 interceptors.

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;

use reqwest::Method;
use serde::Serialize;
use serde_json::{Value, json};

use super::client::ApiClient;
use super::types::{
    ApiError, Category, Document, DocumentQuery, Envelope, FileUpload, Folder, FolderHierarchy, FolderListing,
    LoginRequest, LoginResponse, NewFolder, NewTag, OcrResult, Page, RegisterRequest, SearchQuery, Stats, Tag,
    UserProfile,
};

/// Language sent with `POST /documents/{id}/ocr` when none is given.
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

impl ApiClient {
    #[must_use]
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    #[must_use]
    pub fn documents(&self) -> DocumentApi<'_> {
        DocumentApi { client: self }
    }

    #[must_use]
    pub fn categories(&self) -> CategoryApi<'_> {
        CategoryApi { client: self }
    }

    #[must_use]
    pub fn tags(&self) -> TagApi<'_> {
        TagApi { client: self }
    }

    #[must_use]
    pub fn folders(&self) -> FolderApi<'_> {
        FolderApi { client: self }
    }

    /// `GET /stats`.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn stats(&self) -> Result<Stats, ApiError> {
        self.get_data("/stats").await
    }
}

// =============================================================================
// AUTH
// =============================================================================

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl AuthApi<'_> {
    /// `POST /auth/register`. Does not start a session.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<Value, ApiError> {
        self.client
            .send_json(self.client.request(Method::POST, "/auth/register").json(request))
            .await
    }

    /// `POST /auth/login`.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<LoginResponse, ApiError> {
        self.client.json_data(Method::POST, "/auth/login", request).await
    }

    /// `GET /auth/profile`.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.client.get_data("/auth/profile").await
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

pub struct DocumentApi<'a> {
    client: &'a ApiClient,
}

impl DocumentApi<'_> {
    /// `GET /documents` with filters.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn list(&self, query: &DocumentQuery) -> Result<Page<Document>, ApiError> {
        let envelope: Envelope<Vec<Document>> = self
            .client
            .send_json(self.client.request(Method::GET, "/documents").query(query))
            .await?;
        Ok(into_page(envelope))
    }

    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn get(&self, id: &str) -> Result<Document, ApiError> {
        self.client.get_data(&format!("/documents/{id}")).await
    }

    /// `POST /documents` with the file and metadata `fields` as multipart.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn upload(&self, file: FileUpload, fields: &[(&str, &str)]) -> Result<Document, ApiError> {
        self.multipart("/documents", file, fields).await
    }

    /// `POST /documents/ocr/upload`: store the file and run OCR on it.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn upload_with_ocr(&self, file: FileUpload, fields: &[(&str, &str)]) -> Result<Document, ApiError> {
        self.multipart("/documents/ocr/upload", file, fields).await
    }

    /// `POST /documents/{id}/ocr`. `language` defaults to `eng`.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`, plus `MissingField` when the backend
    /// returned no OCR text.
    pub async fn process_ocr(&self, id: &str, language: Option<&str>) -> Result<OcrResult, ApiError> {
        let body = json!({ "language": language.unwrap_or(DEFAULT_OCR_LANGUAGE) });
        let response: Value = self
            .client
            .send_json(
                self.client
                    .request(Method::POST, &format!("/documents/{id}/ocr"))
                    .json(&body),
            )
            .await?;
        OcrResult::from_body(&response)
    }

    /// `PUT /documents/{id}` with any serializable patch.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn update<B: Serialize + ?Sized>(&self, id: &str, patch: &B) -> Result<Document, ApiError> {
        self.client
            .json_data(Method::PUT, &format!("/documents/{id}"), patch)
            .await
    }

    /// # Errors
    ///
    /// As `ApiClient::send`.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        delete(self.client, &format!("/documents/{id}")).await
    }

    /// `GET /search/documents`.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn search(&self, query: &SearchQuery<'_>) -> Result<Page<Document>, ApiError> {
        let envelope: Envelope<Vec<Document>> = self
            .client
            .send_json(self.client.request(Method::GET, "/search/documents").query(query))
            .await?;
        Ok(into_page(envelope))
    }

    /// `GET /documents/{id}/download`: raw file bytes.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send`.
    pub async fn download(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .send(self.client.request(Method::GET, &format!("/documents/{id}/download")))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// `POST /documents/{id}/summarize`.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn summarize(&self, id: &str) -> Result<Value, ApiError> {
        self.client
            .json_data(Method::POST, &format!("/documents/{id}/summarize"), &json!({}))
            .await
    }

    async fn multipart(&self, path: &str, file: FileUpload, fields: &[(&str, &str)]) -> Result<Document, ApiError> {
        let form = file.into_form(fields)?;
        let envelope: Envelope<Document> = self
            .client
            .send_json(self.client.request(Method::POST, path).multipart(form))
            .await?;
        Ok(envelope.data)
    }
}

// =============================================================================
// CATEGORIES
// =============================================================================

pub struct CategoryApi<'a> {
    client: &'a ApiClient,
}

impl CategoryApi<'_> {
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn list(&self) -> Result<Vec<Category>, ApiError> {
        self.client.get_data("/categories").await
    }

    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn get(&self, id: &str) -> Result<Category, ApiError> {
        self.client.get_data(&format!("/categories/{id}")).await
    }

    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn create<B: Serialize + ?Sized>(&self, category: &B) -> Result<Category, ApiError> {
        self.client.json_data(Method::POST, "/categories", category).await
    }

    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn update<B: Serialize + ?Sized>(&self, id: &str, patch: &B) -> Result<Category, ApiError> {
        self.client
            .json_data(Method::PUT, &format!("/categories/{id}"), patch)
            .await
    }

    /// # Errors
    ///
    /// As `ApiClient::send`.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        delete(self.client, &format!("/categories/{id}")).await
    }
}

// =============================================================================
// TAGS
// =============================================================================

pub struct TagApi<'a> {
    client: &'a ApiClient,
}

impl TagApi<'_> {
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn list(&self) -> Result<Vec<Tag>, ApiError> {
        self.client.get_data("/tags").await
    }

    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn create(&self, tag: &NewTag<'_>) -> Result<Tag, ApiError> {
        self.client.json_data(Method::POST, "/tags", tag).await
    }

    /// # Errors
    ///
    /// As `ApiClient::send`.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        delete(self.client, &format!("/tags/{id}")).await
    }
}

// =============================================================================
// FOLDERS
// =============================================================================

pub struct FolderApi<'a> {
    client: &'a ApiClient,
}

impl FolderApi<'_> {
    /// `GET /folders`: the root folder and its children.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn list(&self) -> Result<FolderListing, ApiError> {
        self.client.get_data("/folders").await
    }

    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn hierarchy(&self, id: &str) -> Result<FolderHierarchy, ApiError> {
        self.client.get_data(&format!("/folders/{id}/hierarchy")).await
    }

    /// Path from the root down to `id`.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn breadcrumb(&self, id: &str) -> Result<Vec<Folder>, ApiError> {
        self.client.get_data(&format!("/folders/{id}/breadcrumb")).await
    }

    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn create(&self, folder: &NewFolder<'_>) -> Result<Folder, ApiError> {
        self.client.json_data(Method::POST, "/folders", folder).await
    }

    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn update(&self, id: &str, name: &str, description: &str) -> Result<Folder, ApiError> {
        self.client
            .json_data(
                Method::PUT,
                &format!("/folders/{id}"),
                &json!({ "name": name, "description": description }),
            )
            .await
    }

    /// # Errors
    ///
    /// As `ApiClient::send`.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        delete(self.client, &format!("/folders/{id}")).await
    }

    /// `PUT /folders/{id}/share`.
    ///
    /// # Errors
    ///
    /// As `ApiClient::send_json`.
    pub async fn share(&self, id: &str, is_public: bool) -> Result<Folder, ApiError> {
        self.client
            .json_data(Method::PUT, &format!("/folders/{id}/share"), &json!({ "isPublic": is_public }))
            .await
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn into_page(envelope: Envelope<Vec<Document>>) -> Page<Document> {
    Page { items: envelope.data, pagination: envelope.pagination.unwrap_or_default() }
}

async fn delete(client: &ApiClient, path: &str) -> Result<(), ApiError> {
    client.send(client.request(Method::DELETE, path)).await?;
    Ok(())
}
