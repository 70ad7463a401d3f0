//! REST boundary of the storage backend.
//!
//! The workspace only talks to [`FileApi`]; [`HttpFileApi`] is the reqwest
//! implementation used by the binary.

pub mod client;
pub mod wire;

pub use client::HttpFileApi;
pub use wire::{UploadAck, UploadedFile};

use async_trait::async_trait;
use std::time::Duration;

use crate::workspace::{FileRecord, ListParams, Scope, UploadBatch};

pub const FILES_PATH: &str = "/api/files";
pub const ADMIN_FILES_PATH: &str = "/api/admin/files";
pub const UPLOAD_PATH: &str = "/api/files/upload";
/// Multipart field repeated once per uploaded file.
pub const UPLOAD_FIELD: &str = "files";

pub fn list_path(scope: Scope) -> &'static str {
    match scope {
        Scope::Mine => FILES_PATH,
        Scope::All => ADMIN_FILES_PATH,
    }
}

pub fn file_path(id: &str) -> String {
    format!("{FILES_PATH}/{}", urlencoding::encode(id))
}

pub fn download_path(id: &str) -> String {
    format!("{}/download", file_path(id))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("server returned {status}")]
    Http { status: u16, detail: Option<String> },
    /// No response at all.
    #[error("request failed: {0}")]
    Network(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Authenticated operations against the file backend.
#[async_trait]
pub trait FileApi: Send + Sync {
    async fn list(&self, scope: Scope, params: &ListParams) -> Result<Vec<FileRecord>, ApiError>;

    async fn upload(&self, batch: UploadBatch) -> Result<UploadAck, ApiError>;

    async fn delete(&self, id: &str) -> Result<(), ApiError>;

    async fn download(&self, id: &str) -> Result<Vec<u8>, ApiError>;
}
