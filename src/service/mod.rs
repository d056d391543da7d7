// src/service/mod.rs - Remote job service interface
pub mod http;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWrite;

pub use http::HttpJobService;
pub use models::{Job, MaterialSpec};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response body: {0}")]
    Decode(String),
    #[error("Local write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Timeout
        } else if e.is_decode() {
            ServiceError::Decode(e.to_string())
        } else {
            ServiceError::Transport(e.to_string())
        }
    }
}

/// Status reported with each heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Idle,
    Printing,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Idle => "idle",
            DeviceStatus::Printing => "printing",
            DeviceStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calls the node makes against the job server.
///
/// Every call is fallible and none retries; the orchestrator decides what a
/// failure means for the current job. Implementations log their own
/// diagnostics before returning an error.
#[async_trait]
pub trait JobService: Send + Sync {
    async fn report_heartbeat(&self, status: DeviceStatus) -> Result<(), ServiceError>;

    /// Pending jobs for this printer, in server order.
    async fn fetch_queue(&self) -> Result<Vec<Job>, ServiceError>;

    async fn notify_job_started(&self, job_id: u64, estimated_minutes: f64) -> Result<(), ServiceError>;

    async fn notify_job_finished(
        &self,
        job_id: u64,
        succeeded: bool,
        actual_material_grams: Option<f64>,
        error_message: Option<&str>,
    ) -> Result<(), ServiceError>;

    /// Stream a remote file into `sink` in bounded chunks. Returns bytes written.
    async fn stream_download(
        &self,
        remote_path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, ServiceError>;
}
