use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

use super::wire::{decode_file_list, decode_upload_ack, error_detail, UploadAck};
use super::{download_path, file_path, list_path, ApiError, FileApi, UPLOAD_FIELD, UPLOAD_PATH};
use crate::workspace::{FileRecord, ListParams, Scope, UploadBatch};

/// reqwest-backed [`FileApi`]. Every request carries the bearer token.
pub struct HttpFileApi {
    client: Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl HttpFileApi {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("filedash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(ApiError::Http {
            status: status.as_u16(),
            detail: error_detail(&body),
        })
    }

    async fn body(&self, response: Response) -> Result<Vec<u8>, ApiError> {
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl FileApi for HttpFileApi {
    async fn list(&self, scope: Scope, params: &ListParams) -> Result<Vec<FileRecord>, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::with_capacity(4);
        if let Some(search) = &params.search {
            query.push(("search", search.clone()));
        }
        if let Some(file_type) = &params.file_type {
            query.push(("file_type", file_type.clone()));
        }
        query.push(("skip", params.paging.skip.to_string()));
        query.push(("limit", params.paging.limit.to_string()));
        debug!(?scope, ?query, "Listing files");

        let request = self.client.get(self.url(list_path(scope))).query(&query);
        let response = self.send(request).await?;
        decode_file_list(&self.body(response).await?)
    }

    async fn upload(&self, batch: UploadBatch) -> Result<UploadAck, ApiError> {
        debug!(files = batch.len(), bytes = batch.total_bytes(), "Uploading batch");
        let mut form = Form::new();
        for file in batch.into_files() {
            let part = Part::bytes(file.data)
                .file_name(file.name)
                .mime_str(&file.mime_type)
                .map_err(|e| ApiError::Network(format!("invalid MIME type {}: {e}", file.mime_type)))?;
            form = form.part(UPLOAD_FIELD, part);
        }

        // reqwest sets the multipart content type and boundary itself.
        let request = self.client.post(self.url(UPLOAD_PATH)).multipart(form);
        let response = self.send(request).await?;
        Ok(decode_upload_ack(&self.body(response).await?))
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        debug!(id, "Deleting file");
        self.send(self.client.delete(self.url(&file_path(id))))
            .await
            .map(drop)
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        debug!(id, "Downloading file");
        let response = self.send(self.client.get(self.url(&download_path(id)))).await?;
        self.body(response).await
    }
}
