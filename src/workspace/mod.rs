//! File workspace: the state behind the dashboard.
//!
//! Owns the query (search terms, type filter, sort, scope) and the fetched
//! file list, and runs every backend interaction: listing, upload, delete
//! and download.

pub mod confirm;
pub mod controller;
pub mod download;
pub mod error;
pub mod guards;
pub mod projection;
pub mod schema;
pub mod upload;

#[cfg(test)]
pub(crate) mod fake;

pub use confirm::{AutoConfirm, Confirmer, PromptConfirm};
pub use controller::{WorkspaceController, WorkspacePorts, DEFAULT_REQUEST_TIMEOUT};
pub use download::{DirectorySink, DownloadSink};
pub use error::WorkspaceError;
pub use schema::{
    CreatedAt, FileRecord, ListParams, Paging, QueryState, Scope, SortBy, SortOrder, WorkspaceState,
    DEFAULT_PAGE_SIZE,
};
pub use upload::{FileSelection, LocalFile, UploadBatch};
