use parking_lot::Mutex;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::confirm::Confirmer;
use super::download::DownloadSink;
use super::error::WorkspaceError;
use super::guards::{self, SearchMode};
use super::projection;
use super::schema::{FileRecord, Paging, QueryState, Scope, SortBy, SortOrder, WorkspaceState};
use super::upload::{FileSelection, UploadBatch};
use crate::api::{ApiError, FileApi};
use crate::auth::Session;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this file?";

const FETCH_FAILED: &str = "Failed to fetch files";
const UPLOAD_FAILED: &str = "Upload failed";
const DELETE_FAILED: &str = "Failed to delete file";
const DOWNLOAD_FAILED: &str = "Failed to download file";

/// Collaborators the controller drives.
#[derive(Clone)]
pub struct WorkspacePorts {
    pub api: Arc<dyn FileApi>,
    pub confirmer: Arc<dyn Confirmer>,
    pub downloads: Arc<dyn DownloadSink>,
}

/// Owner of the file-list workspace: query parameters, the fetched list and
/// the loading/upload/error flags.
///
/// Every list request gets a sequence number; only the response to the most
/// recently issued one may overwrite the list. Deletes do not take a number,
/// so they never invalidate a pending listing. After [`close`](Self::close)
/// in-flight results are dropped and further operations do nothing.
pub struct WorkspaceController {
    session: Arc<Session>,
    ports: WorkspacePorts,
    query: Mutex<QueryState>,
    state: watch::Sender<WorkspaceState>,
    latest_request: AtomicU64,
    fetching: AtomicBool,
    deletes_in_flight: AtomicUsize,
    request_timeout: Duration,
    closed: CancellationToken,
}

impl WorkspaceController {
    pub fn new(session: Session, ports: WorkspacePorts) -> Self {
        let (state, _) = watch::channel(WorkspaceState::default());
        Self {
            session: Arc::new(session),
            ports,
            query: Mutex::new(QueryState::default()),
            state,
            latest_request: AtomicU64::new(0),
            fetching: AtomicBool::new(false),
            deletes_in_flight: AtomicUsize::new(0),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            closed: CancellationToken::new(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the controller and loads the default listing.
    ///
    /// Without a session nothing is fetched and `AuthMissing` is returned;
    /// the caller is expected to send the user to login.
    pub async fn open(
        session: Option<Session>,
        ports: WorkspacePorts,
        request_timeout: Duration,
    ) -> Result<Self, WorkspaceError> {
        let session = session.ok_or(WorkspaceError::AuthMissing)?;
        let controller = Self::new(session, ports).with_request_timeout(request_timeout);
        controller.refresh().await;
        Ok(controller)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn query(&self) -> QueryState {
        self.query.lock().clone()
    }

    pub fn state(&self) -> WorkspaceState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkspaceState> {
        self.state.subscribe()
    }

    /// Sorted copy of the loaded files. Never touches the stored list.
    pub fn view(&self) -> Vec<FileRecord> {
        let (sort_by, order) = {
            let query = self.query.lock();
            (query.sort_by, query.sort_order)
        };
        projection::sorted(&self.state.borrow().files, sort_by, order)
    }

    pub fn file_types(&self) -> Vec<String> {
        projection::unique_file_types(&self.state.borrow().files)
    }

    pub fn set_filename_term(&self, term: impl Into<String>) {
        self.query.lock().filename_term = term.into();
    }

    pub fn set_content_term(&self, term: impl Into<String>) {
        self.query.lock().content_term = term.into();
    }

    /// Sent with the next fetch; does not fetch by itself.
    pub fn set_type_filter(&self, file_type: impl Into<String>) {
        self.query.lock().type_filter = file_type.into();
    }

    /// Sent with the next fetch; does not fetch by itself.
    pub fn set_paging(&self, paging: Paging) {
        self.query.lock().paging = paging;
    }

    pub fn set_sort_by(&self, sort_by: SortBy) {
        self.query.lock().sort_by = sort_by;
    }

    /// Client-side only; returns the new order.
    pub fn toggle_sort_order(&self) -> SortOrder {
        let mut query = self.query.lock();
        query.sort_order = query.sort_order.toggled();
        query.sort_order
    }

    pub async fn run_filename_search(&self) {
        self.run_search(SearchMode::Filename).await;
    }

    pub async fn run_content_search(&self) {
        self.run_search(SearchMode::Content).await;
    }

    async fn run_search(&self, mode: SearchMode) {
        let query = {
            let mut query = self.query.lock();
            guards::select_search(&mut query, mode);
            query.clone()
        };
        self.fetch(query).await;
    }

    /// Switches scope and refetches with the current terms.
    ///
    /// A non-admin asking for [`Scope::All`] gets `ScopeViolation` back and
    /// nothing else happens: no state change, no request, no banner.
    pub async fn set_scope(&self, scope: Scope) -> Result<(), WorkspaceError> {
        if let Err(e) = guards::check_scope(self.session.role(), scope) {
            debug!(user = self.session.user_id(), ?scope, "Scope change rejected");
            return Err(e);
        }
        let query = {
            let mut query = self.query.lock();
            query.scope = scope;
            query.clone()
        };
        self.fetch(query).await;
        Ok(())
    }

    /// Refetches with whatever the query currently holds.
    pub async fn refresh(&self) {
        let query = self.query();
        self.fetch(query).await;
    }

    #[tracing::instrument(name = "workspace.fetch", skip_all, fields(scope = ?query.scope, seq = tracing::field::Empty))]
    async fn fetch(&self, query: QueryState) {
        if self.is_closed() {
            return;
        }
        let ticket = self.begin_request();
        tracing::Span::current().record("seq", ticket.seq);

        let params = guards::list_params(&query);
        let result = self.call(self.ports.api.list(query.scope, &params)).await;
        if !ticket.is_current() {
            debug!("Discarding superseded file list response");
            return;
        }

        match result {
            Ok(files) => {
                info!(count = files.len(), "Loaded files");
                self.publish(|s| {
                    s.files = files;
                    s.error = None;
                });
            }
            Err(WorkspaceError::Closed) => {}
            Err(e) => {
                warn!("File list request failed: {e:?}");
                let banner = match &e {
                    WorkspaceError::Http { .. } => e.to_string(),
                    _ => FETCH_FAILED.to_string(),
                };
                self.publish(|s| {
                    s.files.clear();
                    s.error = Some(banner);
                });
            }
        }
    }

    /// Uploads the selection as one batch and refreshes on success.
    ///
    /// An empty selection is a no-op. More than ten files fail before any
    /// request. The selection is cleared only when the server accepted it.
    #[tracing::instrument(name = "workspace.upload", skip_all, fields(files = selection.len()))]
    pub async fn upload(&self, selection: &mut FileSelection) {
        if self.is_closed() || selection.is_empty() {
            return;
        }
        let batch = match UploadBatch::from_selection(selection) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Upload rejected: {e}");
                self.publish(|s| s.error = Some(e.to_string()));
                return;
            }
        };

        let _upload = self.begin_upload();
        match self.call(self.ports.api.upload(batch)).await {
            Ok(ack) => {
                info!(count = ack.count, "Upload accepted");
                self.publish(|s| s.upload_progress = 100);
                selection.clear();
                self.refresh().await;
            }
            Err(WorkspaceError::Closed) => {}
            Err(e) => {
                warn!("Upload failed: {e:?}");
                let banner = match e {
                    WorkspaceError::Http {
                        detail: Some(detail),
                        ..
                    } => detail,
                    _ => UPLOAD_FAILED.to_string(),
                };
                self.publish(|s| s.error = Some(banner));
            }
        }
    }

    /// Deletes after confirmation, then refreshes. Declining does nothing.
    #[tracing::instrument(name = "workspace.delete", skip(self))]
    pub async fn delete_file(&self, id: &str) {
        if self.is_closed() {
            return;
        }
        if !self.ports.confirmer.confirm(DELETE_PROMPT) {
            debug!("Delete declined");
            return;
        }

        let _busy = self.begin_delete();
        match self.call(self.ports.api.delete(id)).await {
            Ok(()) => {
                info!("File deleted");
                self.refresh().await;
            }
            Err(WorkspaceError::Closed) => {}
            Err(e) => {
                warn!("Delete failed: {e:?}");
                self.publish(|s| s.error = Some(DELETE_FAILED.to_string()));
            }
        }
    }

    /// Fetches the payload and hands it to the download sink as `name`.
    /// Leaves the file list alone. Returns where the file was saved.
    #[tracing::instrument(name = "workspace.download", skip(self))]
    pub async fn download_file(&self, id: &str, name: &str) -> Option<PathBuf> {
        if self.is_closed() {
            return None;
        }
        self.publish(|s| s.error = None);

        let data = match self.call(self.ports.api.download(id)).await {
            Ok(data) => data,
            Err(WorkspaceError::Closed) => return None,
            Err(e) => {
                warn!("Download failed: {e:?}");
                self.publish(|s| s.error = Some(DOWNLOAD_FAILED.to_string()));
                return None;
            }
        };

        match self.ports.downloads.save(name, data).await {
            Ok(path) => {
                info!(path = %path.display(), "Download saved");
                Some(path)
            }
            Err(e) => {
                warn!("Saving download failed: {e:#}");
                self.publish(|s| s.error = Some(DOWNLOAD_FAILED.to_string()));
                None
            }
        }
    }

    /// Tears the workspace down. In-flight results are ignored from now on.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Bounds a backend call by the request timeout and by `close`.
    async fn call<T, F>(&self, request: F) -> Result<T, WorkspaceError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        tokio::select! {
            _ = self.closed.cancelled() => Err(WorkspaceError::Closed),
            outcome = tokio::time::timeout(self.request_timeout, request) => match outcome {
                Ok(result) => result.map_err(WorkspaceError::from),
                Err(_) => Err(ApiError::Timeout(self.request_timeout).into()),
            },
        }
    }

    fn publish(&self, update: impl FnOnce(&mut WorkspaceState)) {
        if self.is_closed() {
            return;
        }
        self.state.send_modify(update);
    }

    fn begin_request(&self) -> RequestTicket<'_> {
        let seq = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.fetching.store(true, Ordering::SeqCst);
        self.publish(|s| s.error = None);
        self.sync_loading();
        RequestTicket { owner: self, seq }
    }

    fn begin_delete(&self) -> DeleteGuard<'_> {
        self.deletes_in_flight.fetch_add(1, Ordering::SeqCst);
        self.publish(|s| s.error = None);
        self.sync_loading();
        DeleteGuard { owner: self }
    }

    /// `loading` is on while the latest list request or any delete is pending.
    fn sync_loading(&self) {
        let loading = self.fetching.load(Ordering::SeqCst)
            || self.deletes_in_flight.load(Ordering::SeqCst) > 0;
        self.state.send_if_modified(|s| {
            let changed = s.loading != loading;
            s.loading = loading;
            changed
        });
    }

    fn begin_upload(&self) -> UploadGuard<'_> {
        self.publish(|s| {
            s.uploading = true;
            s.upload_progress = 0;
            s.error = None;
        });
        UploadGuard { owner: self }
    }
}

/// Sets `loading` back to false on every exit path, unless a newer request
/// has taken over the flag.
struct RequestTicket<'a> {
    owner: &'a WorkspaceController,
    seq: u64,
}

impl RequestTicket<'_> {
    fn is_current(&self) -> bool {
        !self.owner.is_closed() && self.owner.latest_request.load(Ordering::SeqCst) == self.seq
    }
}

impl Drop for RequestTicket<'_> {
    fn drop(&mut self) {
        if self.owner.latest_request.load(Ordering::SeqCst) == self.seq {
            self.owner.fetching.store(false, Ordering::SeqCst);
            self.owner.sync_loading();
        }
    }
}

struct DeleteGuard<'a> {
    owner: &'a WorkspaceController,
}

impl Drop for DeleteGuard<'_> {
    fn drop(&mut self) {
        self.owner.deletes_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.owner.sync_loading();
    }
}

struct UploadGuard<'a> {
    owner: &'a WorkspaceController,
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.owner.state.send_modify(|s| {
            s.uploading = false;
            s.upload_progress = 0;
        });
    }
}
