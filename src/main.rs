//! drive_gateway server - HTTP facade over Google Drive.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use drive_gateway::{api, Authenticator, DriveClient, DriveManager};

/// HTTP gateway for listing, uploading, downloading, and deleting files in
/// Google Drive.
#[derive(Parser)]
#[command(name = "drive_gateway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to service account JSON credentials file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: PathBuf,

    /// Folder id under which upload paths are resolved ("root" for the
    /// drive root).
    #[arg(long, env = "DRIVE_ROOT_FOLDER", default_value = "root")]
    root_folder: String,

    /// Address to bind the HTTP server on.
    #[arg(long, env = "DRIVE_GATEWAY_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drive_gateway=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let auth = Authenticator::from_file(&cli.credentials)
        .with_context(|| format!("Failed to load credentials from {:?}", cli.credentials))?;
    let client = DriveClient::new(auth);
    let manager = Arc::new(DriveManager::new(client, cli.root_folder));

    let app = api::router(manager);
    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    tracing::info!(addr = %cli.bind, "drive_gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
