//! Thin REST client for the Google Drive v3 API.

use bytes::Bytes;
use futures::Stream;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, DriveFile, FileListResponse, FOLDER_MIME_TYPE};

/// Base URL for Google Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API v3.
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields requested on every metadata call.
const FILE_FIELDS: &str = "id, name, mimeType, parents";

/// Client for the Drive REST surface used by the gateway: list with query
/// and pagination, metadata get, content download, create (with and without
/// content), and delete.
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    /// Create a client against the production Google endpoints.
    pub fn new(auth: Authenticator) -> Self {
        Self::with_base_urls(auth, DRIVE_API_BASE, UPLOAD_API_BASE)
    }

    /// Create a client against custom endpoints. Used by tests to point at
    /// a mock server.
    pub fn with_base_urls(
        auth: Authenticator,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            http: Client::new(),
            api_base: api_base.into(),
            upload_base: upload_base.into(),
        }
    }

    /// List one page of children of `parent_id`.
    pub async fn list_children(&self, parent_id: &str, page_size: u32) -> Result<Vec<DriveFile>> {
        let query = format!("'{}' in parents and trashed = false", parent_id);
        let page = self.list_page(&query, None, Some(page_size)).await?;
        Ok(page.files)
    }

    /// Lazy page sequence over the folders directly under `parent_id`.
    ///
    /// Pages are fetched on demand via [`FolderPages::next_page`]; callers
    /// stop polling once they find what they need.
    pub fn folder_pages(&self, parent_id: &str) -> FolderPages<'_> {
        let query = format!(
            "mimeType = '{}' and '{}' in parents and trashed = false",
            FOLDER_MIME_TYPE, parent_id
        );
        FolderPages {
            client: self,
            query,
            page_token: None,
            exhausted: false,
        }
    }

    /// Get file metadata by id.
    pub async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Stream the raw content of a file.
    pub async fn download(
        &self,
        file_id: &str,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>>> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("alt", "media")])
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.bytes_stream())
    }

    /// Delete a file by id.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .delete(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    /// Create an empty folder named `name` under `parent_id`.
    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile> {
        let token = self.auth.access_token().await?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });

        let response = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata)
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Create a file named `name` under `parent_id` with `content` as its
    /// bytes, via a multipart upload.
    pub async fn upload_file(
        &self,
        name: &str,
        mime_type: &str,
        content: Bytes,
        parent_id: &str,
    ) -> Result<DriveFile> {
        let token = self.auth.access_token().await?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id],
        });

        let metadata_part = Part::text(metadata.to_string()).mime_str("application/json")?;
        let file_part = Part::bytes(content.to_vec())
            .file_name(name.to_string())
            .mime_str(mime_type)?;

        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .multipart(form)
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch one page of a files.list query.
    async fn list_page(
        &self,
        query: &str,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FileListResponse> {
        let token = self.auth.access_token().await?;

        let mut request = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[
                ("q", query),
                ("spaces", "drive"),
                ("fields", "nextPageToken, files(id, name, mimeType)"),
            ]);

        if let Some(size) = page_size {
            request = request.query(&[("pageSize", size.to_string())]);
        }
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Map a non-success response to [`DriveError::Api`], preferring the
    /// structured Drive error body when it parses.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
            return Err(DriveError::Api {
                status: api_error.error.code,
                message: api_error.error.message,
            });
        }
        Err(DriveError::Api {
            status: status.as_u16(),
            message: body,
        })
    }
}

/// Explicit iteration state over the pages of a folder search.
pub struct FolderPages<'a> {
    client: &'a DriveClient,
    query: String,
    page_token: Option<String>,
    exhausted: bool,
}

impl FolderPages<'_> {
    /// Fetch the next page, or `None` once the token stream is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<DriveFile>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .client
            .list_page(&self.query, self.page_token.as_deref(), None)
            .await?;

        self.page_token = page.next_page_token;
        if self.page_token.is_none() {
            self.exhausted = true;
        }
        Ok(Some(page.files))
    }
}
