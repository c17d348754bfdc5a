//! Data models for Google Drive API requests and responses.

use serde::{Deserialize, Serialize};

/// MIME type Google Drive reserves for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A file or folder as returned by the Drive API.
///
/// Folders are ordinary files carrying [`FOLDER_MIME_TYPE`]; there is no
/// separate folder representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

impl DriveFile {
    /// Whether this entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

/// The `{id, name}` shape exposed by the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
}

impl From<DriveFile> for FileSummary {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
        }
    }
}

/// Response from the `files.list` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google API error response body.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Service account credentials from a JSON key file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_file_deserializes_camel_case() {
        let json = r#"{
            "id": "abc123",
            "name": "report.pdf",
            "mimeType": "application/pdf",
            "parents": ["root"]
        }"#;

        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "abc123");
        assert_eq!(file.name, "report.pdf");
        assert_eq!(file.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(file.parents, Some(vec!["root".to_string()]));
        assert!(!file.is_folder());
    }

    #[test]
    fn folder_is_detected_by_mime_type() {
        let file: DriveFile = serde_json::from_str(
            r#"{"id": "f1", "name": "docs", "mimeType": "application/vnd.google-apps.folder"}"#,
        )
        .unwrap();
        assert!(file.is_folder());
    }

    #[test]
    fn file_summary_drops_everything_but_id_and_name() {
        let file: DriveFile =
            serde_json::from_str(r#"{"id": "f1", "name": "a.txt", "mimeType": "text/plain"}"#)
                .unwrap();
        let summary = FileSummary::from(file);
        assert_eq!(
            summary,
            FileSummary {
                id: "f1".to_string(),
                name: "a.txt".to_string()
            }
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json, serde_json::json!({"id": "f1", "name": "a.txt"}));
    }

    #[test]
    fn list_response_defaults_are_empty() {
        let response: FileListResponse = serde_json::from_str("{}").unwrap();
        assert!(response.files.is_empty());
        assert!(response.next_page_token.is_none());
    }
}
