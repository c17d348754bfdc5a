//! Drive operations behind the HTTP API: list, download, delete, and
//! upload with folder-path resolution.

use bytes::Bytes;
use futures::Stream;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::client::DriveClient;
use crate::error::{DriveError, Result};
use crate::models::{DriveFile, FileSummary};

/// Page size used by the list endpoint, matching the original service.
const LIST_PAGE_SIZE: u32 = 10;

/// A file received from the client, held in memory for upload.
pub struct IncomingFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Per-file result of an upload batch.
pub struct UploadOutcome {
    pub name: String,
    pub result: Result<DriveFile>,
}

/// Translates gateway operations into Drive client calls.
///
/// Owns the long-lived client handle; constructed once at process start and
/// shared across request handlers.
pub struct DriveManager {
    client: DriveClient,
    root_id: String,
    // Serializes folder-path resolution so concurrent uploads to the same
    // not-yet-existing path cannot create duplicate folders in this process.
    // Other processes can still race; Drive offers no compare-and-create.
    resolve_lock: Mutex<()>,
}

impl DriveManager {
    /// Create a manager resolving paths under `root_id` ("root" for the
    /// drive root).
    pub fn new(client: DriveClient, root_id: impl Into<String>) -> Self {
        Self {
            client,
            root_id: root_id.into(),
            resolve_lock: Mutex::new(()),
        }
    }

    /// List children of `parent_id`, defaulting to the root folder.
    pub async fn list(&self, parent_id: Option<&str>) -> Result<Vec<FileSummary>> {
        let parent = parent_id.unwrap_or(&self.root_id);
        let files = self.client.list_children(parent, LIST_PAGE_SIZE).await?;
        info!(parent, count = files.len(), "listed files");
        Ok(files.into_iter().map(FileSummary::from).collect())
    }

    /// Fetch metadata and a content stream for a file.
    pub async fn download(
        &self,
        file_id: &str,
    ) -> Result<(DriveFile, impl Stream<Item = reqwest::Result<Bytes>>)> {
        let metadata = self.client.get_file(file_id).await?;
        let stream = self.client.download(file_id).await?;
        Ok((metadata, stream))
    }

    /// Delete a file by id.
    pub async fn delete(&self, file_id: &str) -> Result<()> {
        self.client.delete_file(file_id).await?;
        info!(file_id, "file deleted");
        Ok(())
    }

    /// Upload `files` into the folder named by `path`, creating missing
    /// folder levels first.
    ///
    /// Folder resolution failures propagate. Per-file failures do not abort
    /// the batch; each file's result is reported in its [`UploadOutcome`].
    pub async fn upload(
        &self,
        files: Vec<IncomingFile>,
        path: Option<&str>,
    ) -> Result<Vec<UploadOutcome>> {
        let folder_id = match path {
            Some(path) => self.resolve_folder_path(path).await?,
            None => self.root_id.clone(),
        };

        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let mime_type = file.content_type.clone().unwrap_or_else(|| {
                mime_guess::from_path(&file.name)
                    .first_or_octet_stream()
                    .to_string()
            });

            let result = self
                .client
                .upload_file(&file.name, &mime_type, file.bytes, &folder_id)
                .await;

            match &result {
                Ok(uploaded) => info!(name = %file.name, id = %uploaded.id, "file uploaded"),
                Err(err) => warn!(name = %file.name, error = %err, "upload failed"),
            }
            outcomes.push(UploadOutcome {
                name: file.name,
                result,
            });
        }

        Ok(outcomes)
    }

    /// Resolve a slash-delimited folder path to the leaf folder's id,
    /// creating any missing level.
    ///
    /// Empty segments (consecutive, leading, or trailing slashes) are
    /// skipped; a path with no non-empty segment resolves to the root.
    pub async fn resolve_folder_path(&self, path: &str) -> Result<String> {
        let _guard = self.resolve_lock.lock().await;

        let mut parent_id = self.root_id.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            parent_id = self.find_or_create_folder(&parent_id, segment).await?;
        }
        Ok(parent_id)
    }

    async fn find_or_create_folder(&self, parent_id: &str, name: &str) -> Result<String> {
        if let Some(existing) = self.find_folder(parent_id, name).await? {
            return Ok(existing.id);
        }

        let created = self.client.create_folder(name, parent_id).await?;
        info!(name, parent = parent_id, id = %created.id, "folder created");
        Ok(created.id)
    }

    /// Search the folders under `parent_id` for one named `name`
    /// (case-insensitive), paging until a match is found or the pages run
    /// out. The first match wins, keeping resolution deterministic even
    /// when duplicate names exist.
    async fn find_folder(&self, parent_id: &str, name: &str) -> Result<Option<DriveFile>> {
        let mut pages = self.client.folder_pages(parent_id);
        while let Some(folders) = pages.next_page().await? {
            if let Some(found) = folders
                .into_iter()
                .find(|folder| folder.name.eq_ignore_ascii_case(name))
            {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl UploadOutcome {
    /// The uploaded record, if this file succeeded.
    pub fn uploaded(&self) -> Option<&DriveFile> {
        self.result.as_ref().ok()
    }

    /// The failure, if this file was dropped.
    pub fn error(&self) -> Option<&DriveError> {
        self.result.as_ref().err()
    }
}
