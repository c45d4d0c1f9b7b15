//! Download coordinator: time-limited download descriptors and file retrieval.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::services::error::PortalError;
use crate::services::http::Api;

/// Short-lived, server-issued grant for a generated report file. Shown to the
/// user together with its expiry.
#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "camelCase"))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadDescriptor {
    pub file_name: String,
    pub download_url: String,
    #[serde(default)]
    pub expiry_time: String,
}

#[derive(Debug, Clone)]
pub struct ReportFile {
    pub descriptor: DownloadDescriptor,
    pub content: Vec<u8>,
}

/// Transport seam for the download service.
#[async_trait]
pub trait DownloadApi: Send + Sync {
    async fn descriptor(&self, report_id: i64) -> Result<DownloadDescriptor, PortalError>;
    async fn fetch(&self, descriptor: &DownloadDescriptor) -> Result<Vec<u8>, PortalError>;
}

pub struct DownloadClient {
    api: Api,
    // The descriptor URL is pre-signed; retrieval must not attach the bearer
    // token, so it goes through a separate unauthenticated client.
    file_client: reqwest::Client,
}

impl DownloadClient {
    pub fn new(api: Api) -> Self {
        Self {
            api,
            file_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DownloadApi for DownloadClient {
    /// GET `/{reportId}/download`.
    async fn descriptor(&self, report_id: i64) -> Result<DownloadDescriptor, PortalError> {
        self.api.get(&format!("/{report_id}/download"), &[]).await
    }

    async fn fetch(&self, descriptor: &DownloadDescriptor) -> Result<Vec<u8>, PortalError> {
        let response = self
            .file_client
            .get(&descriptor.download_url)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(file_fetch_error(status.as_u16(), &descriptor.file_name));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn file_fetch_error(status: u16, file_name: &str) -> PortalError {
    PortalError::fetch(
        Some(status),
        None,
        format!("report file retrieval failed for {file_name}"),
    )
}

pub struct DownloadService {
    api: Arc<dyn DownloadApi>,
}

impl DownloadService {
    pub fn new(api: Arc<dyn DownloadApi>) -> Self {
        Self { api }
    }

    pub async fn descriptor(&self, report_id: i64) -> Result<DownloadDescriptor, PortalError> {
        self.api.descriptor(report_id).await
    }

    /// Fetch the descriptor, then retrieve the file it points at.
    /// No retry; a single error surfaces for the whole operation, and a
    /// descriptor failure skips the file request entirely.
    pub async fn download(&self, report_id: i64) -> Result<ReportFile, PortalError> {
        let descriptor = self.api.descriptor(report_id).await?;
        let content = self.api.fetch(&descriptor).await?;
        Ok(ReportFile {
            descriptor,
            content,
        })
    }
}
