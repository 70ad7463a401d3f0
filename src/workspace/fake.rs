//! In-memory doubles for controller tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::oneshot;

use super::download::DownloadSink;
use super::schema::{CreatedAt, FileRecord, ListParams, Scope};
use super::upload::UploadBatch;
use crate::api::{ApiError, FileApi, UploadAck};

pub fn record(id: &str, name: &str, file_type: &str, size: u64, created_at: &str) -> FileRecord {
    FileRecord {
        id: id.into(),
        name: name.into(),
        file_type: file_type.into(),
        size,
        created_at: CreatedAt::parse(created_at),
        owner: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List { scope: Scope, params: ListParams },
    Upload { names: Vec<String> },
    Delete { id: String },
    Download { id: String },
}

struct Scripted<T> {
    result: Result<T, ApiError>,
    gate: Option<oneshot::Receiver<()>>,
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Result<T, ApiError> {
        if let Some(gate) = self.gate {
            let _ = gate.await;
        }
        self.result
    }
}

/// Replays queued responses in call order and records every call.
/// Unscripted lists are empty; other unscripted calls succeed.
#[derive(Default)]
pub struct ScriptedApi {
    calls: Mutex<Vec<Call>>,
    lists: Mutex<VecDeque<Scripted<Vec<FileRecord>>>>,
    uploads: Mutex<VecDeque<Scripted<UploadAck>>>,
    deletes: Mutex<VecDeque<Result<(), ApiError>>>,
    downloads: Mutex<VecDeque<Result<Vec<u8>, ApiError>>>,
}

impl ScriptedApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn push_list(&self, result: Result<Vec<FileRecord>, ApiError>) {
        self.lists.lock().push_back(Scripted { result, gate: None });
    }

    /// The response is held back until `gate` fires (or its sender drops).
    pub fn push_list_gated(
        &self,
        result: Result<Vec<FileRecord>, ApiError>,
        gate: oneshot::Receiver<()>,
    ) {
        self.lists.lock().push_back(Scripted {
            result,
            gate: Some(gate),
        });
    }

    pub fn push_upload(&self, result: Result<UploadAck, ApiError>) {
        self.uploads.lock().push_back(Scripted { result, gate: None });
    }

    pub fn push_upload_gated(&self, result: Result<UploadAck, ApiError>, gate: oneshot::Receiver<()>) {
        self.uploads.lock().push_back(Scripted {
            result,
            gate: Some(gate),
        });
    }

    pub fn push_delete(&self, result: Result<(), ApiError>) {
        self.deletes.lock().push_back(result);
    }

    pub fn push_download(&self, result: Result<Vec<u8>, ApiError>) {
        self.downloads.lock().push_back(result);
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl FileApi for ScriptedApi {
    async fn list(&self, scope: Scope, params: &ListParams) -> Result<Vec<FileRecord>, ApiError> {
        self.record_call(Call::List {
            scope,
            params: params.clone(),
        });
        let next = self.lists.lock().pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    async fn upload(&self, batch: UploadBatch) -> Result<UploadAck, ApiError> {
        self.record_call(Call::Upload {
            names: batch.names().into_iter().map(str::to_string).collect(),
        });
        let next = self.uploads.lock().pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Ok(UploadAck::default()),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.record_call(Call::Delete { id: id.into() });
        let next = self.deletes.lock().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        self.record_call(Call::Download { id: id.into() });
        let next = self.downloads.lock().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Keeps saved downloads in memory; paths are `memory/<name>`.
#[derive(Default)]
pub struct MemorySink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
    fail_next: Mutex<bool>,
}

impl MemorySink {
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().clone()
    }

    pub fn fail_next(&self) {
        *self.fail_next.lock() = true;
    }
}

#[async_trait]
impl DownloadSink for MemorySink {
    async fn save(&self, name: &str, data: Vec<u8>) -> Result<PathBuf> {
        if std::mem::take(&mut *self.fail_next.lock()) {
            return Err(anyhow!("disk full"));
        }
        self.saved.lock().push((name.to_string(), data));
        Ok(PathBuf::from("memory").join(name))
    }
}
