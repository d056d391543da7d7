//! reqwest-backed [`JobService`] talking to the job server REST API.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::models::{FinishJobRequest, Job, PingRequest, QueueResponse, StartJobRequest};
use super::{DeviceStatus, JobService, ServiceError};
use crate::config::ServerConfig;

const PROGRESS_LOG_BYTES: u64 = 10 * 1024;
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpJobService {
    client: Client,
    base_url: String,
    printer_id: u64,
    request_timeout: Duration,
    finish_timeout: Duration,
    download_timeout: Duration,
    chunk_size: usize,
}

impl HttpJobService {
    pub fn new(config: &ServerConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .user_agent(concat!("krusty-node/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            printer_id: config.printer_id,
            request_timeout: config.request_timeout(),
            finish_timeout: config.finish_timeout(),
            download_timeout: config.download_timeout(),
            chunk_size: config.download_chunk_size.max(1),
        })
    }

    pub fn printer_id(&self) -> u64 {
        self.printer_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn printer_url(&self, suffix: &str) -> String {
        self.url(&format!("/api/Printer/{}{}", self.printer_id, suffix))
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T, timeout: Duration) -> Result<(), ServiceError> {
        let result = async {
            let response = self.client.post(url).json(body).timeout(timeout).send().await?;
            check_status(response).await?;
            Ok(())
        }
        .await;
        if let Err(ref e) = result {
            tracing::warn!("POST {} failed: {}", url, e);
        }
        result
    }

    async fn download_into(
        &self,
        remote_path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, ServiceError> {
        let response = self
            .client
            .get(self.url("/api/Printer/files/download"))
            .query(&[("path", remote_path)])
            .timeout(self.download_timeout)
            .send()
            .await?;
        let mut response = check_status(response).await?;

        let declared = response.content_length();
        match declared {
            Some(len) => tracing::info!("Download size: {} bytes", len),
            None => tracing::info!("Download size: unknown"),
        }

        let mut written: u64 = 0;
        let mut next_log = PROGRESS_LOG_BYTES;
        'body: while let Some(chunk) = response.chunk().await? {
            for piece in chunk.chunks(self.chunk_size) {
                let piece = match declared {
                    Some(limit) if written >= limit => break 'body,
                    Some(limit) => &piece[..piece.len().min((limit - written) as usize)],
                    None => piece,
                };
                sink.write_all(piece).await?;
                written += piece.len() as u64;
            }
            if written >= next_log {
                tracing::debug!("Download progress: {} bytes", written);
                next_log = written + PROGRESS_LOG_BYTES;
            }
            if declared.is_some_and(|limit| written >= limit) {
                break;
            }
        }
        sink.flush().await?;
        Ok(written)
    }
}

async fn check_status(response: Response) -> Result<Response, ServiceError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

async fn status_error(response: Response) -> ServiceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ServiceError::Status { status, body: body.chars().take(ERROR_BODY_PREVIEW).collect() }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn report_heartbeat(&self, status: DeviceStatus) -> Result<(), ServiceError> {
        tracing::debug!("Ping: {}", status);
        let body = PingRequest { status: status.as_str().to_string() };
        self.post_json(&self.printer_url("/ping"), &body, self.request_timeout).await
    }

    async fn fetch_queue(&self) -> Result<Vec<Job>, ServiceError> {
        let url = self.printer_url("/queue");
        let result = async {
            let response = self.client.get(&url).timeout(self.request_timeout).send().await?;
            let bytes = check_status(response).await?.bytes().await?;
            if bytes.is_empty() {
                return Ok(Vec::new());
            }
            let queue: QueueResponse =
                serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))?;
            Ok(queue.into_jobs())
        }
        .await;
        match &result {
            Ok(jobs) => tracing::debug!("Queue has {} job(s)", jobs.len()),
            Err(e) => tracing::warn!("GET {} failed: {}", url, e),
        }
        result
    }

    async fn notify_job_started(&self, job_id: u64, estimated_minutes: f64) -> Result<(), ServiceError> {
        tracing::info!("Starting job {} on server, estimate {:.2} min", job_id, estimated_minutes);
        let body = StartJobRequest { actual_estimated_time: estimated_minutes };
        self.post_json(&self.printer_url(&format!("/jobs/{}/start", job_id)), &body, self.request_timeout)
            .await
    }

    async fn notify_job_finished(
        &self,
        job_id: u64,
        succeeded: bool,
        actual_material_grams: Option<f64>,
        error_message: Option<&str>,
    ) -> Result<(), ServiceError> {
        tracing::info!("Finishing job {} on server: {}", job_id, if succeeded { "SUCCESS" } else { "FAILED" });
        let body = FinishJobRequest {
            is_success: succeeded,
            actual_material_in_grams: actual_material_grams,
            error_message: error_message.map(str::to_string),
        };
        self.post_json(&self.printer_url(&format!("/jobs/{}/finish", job_id)), &body, self.finish_timeout)
            .await
    }

    async fn stream_download(
        &self,
        remote_path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, ServiceError> {
        tracing::info!("Downloading '{}'", remote_path);
        match self.download_into(remote_path, sink).await {
            Ok(bytes) => {
                tracing::info!("Downloaded '{}' ({} bytes)", remote_path, bytes);
                Ok(bytes)
            }
            Err(e) => {
                tracing::warn!("Download of '{}' failed: {}", remote_path, e);
                Err(e)
            }
        }
    }
}
