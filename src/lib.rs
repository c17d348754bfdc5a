//! drive_gateway - a small HTTP facade over Google Drive.
//!
//! The gateway exposes four endpoints:
//! - `GET /list?parentId=<id>` - list children of a folder (default: root)
//! - `GET /download/{fileID}` - stream a file's bytes
//! - `GET /delete/{fileID}` - delete a file
//! - `POST /upload` - multipart upload into a slash-delimited folder path,
//!   creating missing folder levels on the way
//!
//! All state lives in Google Drive; the gateway holds only a long-lived
//! authenticated client.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use drive_gateway::{api, Authenticator, DriveClient, DriveManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::from_file("service-account.json")?;
//!     let client = DriveClient::new(auth);
//!     let manager = Arc::new(DriveManager::new(client, "root"));
//!
//!     let app = api::router(manager);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod manager;
pub mod models;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::DriveClient;
pub use error::{DriveError, Result};
pub use manager::{DriveManager, IncomingFile, UploadOutcome};
pub use models::{DriveFile, FileSummary};
