//! HTTP API layer: routes, handlers, and error-to-response mapping.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::DriveError;
use crate::manager::{DriveManager, IncomingFile};
use crate::models::FileSummary;

/// Upper bound on a multipart upload request body.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DriveManager>,
}

/// Build the gateway router.
pub fn router(manager: Arc<DriveManager>) -> Router {
    Router::new()
        .route("/list", get(list))
        .route("/download/:file_id", get(download))
        .route("/delete/:file_id", get(delete))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { manager })
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
}

/// `GET /list?parentId=<id>` — children of `parentId`, default root.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FileSummary>>, ApiError> {
    let files = state.manager.list(query.parent_id.as_deref()).await?;
    Ok(Json(files))
}

/// `GET /download/{fileID}` — stream the file's bytes to the client.
async fn download(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let (metadata, stream) = state.manager.download(&file_id).await?;

    let mut headers = HeaderMap::new();
    let content_type = metadata
        .mime_type
        .as_deref()
        .and_then(|m| HeaderValue::from_str(m).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", metadata.name))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, Body::from_stream(stream)).into_response())
}

/// `GET /delete/{fileID}` — delete the file, no body.
async fn delete(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.manager.delete(&file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /upload` — multipart form with one or more file fields and an
/// optional `path` text field naming the destination folder path.
///
/// Responds with the `{id, name}` records of the files that uploaded;
/// 500 when nothing was uploaded.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<FileSummary>>, ApiError> {
    let mut path: Option<String> = None;
    let mut files: Vec<IncomingFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("malformed multipart request: {err}")))?
    {
        let filename = field.file_name().map(|s| s.to_string());
        let field_name = field.name().map(|s| s.to_string());
        let content_type = field.content_type().map(|m| m.to_string());

        if let Some(name) = filename {
            let bytes = field
                .bytes()
                .await
                .map_err(|err| ApiError::BadRequest(format!("failed to read file field: {err}")))?;
            files.push(IncomingFile {
                name,
                content_type,
                bytes,
            });
        } else if field_name.as_deref() == Some("path") {
            let text = field
                .text()
                .await
                .map_err(|err| ApiError::BadRequest(format!("failed to read path field: {err}")))?;
            path = Some(text);
        } else {
            // Unknown text field; drain and ignore.
            let _ = field.bytes().await;
        }
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("no file fields in upload".into()));
    }

    let outcomes = state.manager.upload(files, path.as_deref()).await?;
    let uploaded: Vec<FileSummary> = outcomes
        .into_iter()
        .filter_map(|outcome| outcome.result.ok().map(FileSummary::from))
        .collect();

    if uploaded.is_empty() {
        warn!("upload produced no files");
        return Err(ApiError::NothingUploaded);
    }
    Ok(Json(uploaded))
}

/// Errors surfaced to HTTP clients.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NothingUploaded,
    Upstream(DriveError),
}

impl From<DriveError> for ApiError {
    fn from(error: DriveError) -> Self {
        ApiError::Upstream(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NothingUploaded => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "no files were uploaded".to_string(),
            )
                .into_response(),
            ApiError::Upstream(err) => {
                warn!(error = %err, "drive call failed");
                (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Authenticator;
    use crate::client::DriveClient;
    use mockito::{Matcher, Server};
    use serde_json::json;

    async fn make_state(server: &Server) -> AppState {
        let auth = Authenticator::fixed("test-token");
        let client = DriveClient::with_base_urls(auth, server.url(), server.url());
        AppState {
            manager: Arc::new(DriveManager::new(client, "root")),
        }
    }

    #[tokio::test]
    async fn list_defaults_to_root() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_query(Matcher::UrlEncoded(
                "q".into(),
                "'root' in parents and trashed = false".into(),
            ))
            .with_body(
                json!({
                    "files": [
                        {"id": "f1", "name": "a.txt"},
                        {"id": "f2", "name": "b.txt"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let state = make_state(&server).await;
        let Json(files) = list(State(state), Query(ListQuery { parent_id: None }))
            .await
            .expect("list failed");

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, "f1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_passes_parent_filter() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_query(Matcher::UrlEncoded(
                "q".into(),
                "'folder9' in parents and trashed = false".into(),
            ))
            .with_body(json!({"files": []}).to_string())
            .create_async()
            .await;

        let state = make_state(&server).await;
        let Json(files) = list(
            State(state),
            Query(ListQuery {
                parent_id: Some("folder9".to_string()),
            }),
        )
        .await
        .expect("list failed");

        assert!(files.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_returns_no_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/files/doc42")
            .with_status(204)
            .create_async()
            .await;

        let state = make_state(&server).await;
        let status = delete(State(state), Path("doc42".to_string()))
            .await
            .expect("delete failed");

        assert_eq!(status, StatusCode::NO_CONTENT);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_maps_drive_failure_to_bad_gateway() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/files/doc42")
            .with_status(403)
            .with_body(json!({"error": {"code": 403, "message": "quota"}}).to_string())
            .create_async()
            .await;

        let state = make_state(&server).await;
        let err = delete(State(state), Path("doc42".to_string()))
            .await
            .expect_err("delete should fail");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn download_sets_metadata_headers() {
        let mut server = Server::new_async().await;
        let metadata_mock = server
            .mock("GET", "/files/doc1")
            .match_query(Matcher::UrlEncoded(
                "fields".into(),
                "id, name, mimeType, parents".into(),
            ))
            .with_body(
                json!({"id": "doc1", "name": "report.pdf", "mimeType": "application/pdf"})
                    .to_string(),
            )
            .create_async()
            .await;
        let content_mock = server
            .mock("GET", "/files/doc1")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_body("pdf-bytes")
            .create_async()
            .await;

        let state = make_state(&server).await;
        let response = download(State(state), Path("doc1".to_string()))
            .await
            .expect("download failed");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"report.pdf\""
        );
        metadata_mock.assert_async().await;
        content_mock.assert_async().await;
    }
}
