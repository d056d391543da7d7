#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use krusty_node::service::{DeviceStatus, Job, JobService, ServiceError};
use krusty_node::ui::Display;

#[derive(Debug, Clone, PartialEq)]
pub struct Finished {
    pub job_id: u64,
    pub succeeded: bool,
    pub material: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub heartbeats: Vec<DeviceStatus>,
    pub queue: Vec<Job>,
    pub queue_fetches: usize,
    pub started: Vec<(u64, f64)>,
    pub finished: Vec<Finished>,
    pub files: HashMap<String, Vec<u8>>,
    pub fail_download: bool,
    pub reject_start: bool,
}

/// In-memory job service recording every call.
#[derive(Debug, Default)]
pub struct MockJobService {
    pub state: Mutex<MockState>,
}

impl MockJobService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_job(job: Job, gcode: &str) -> Arc<Self> {
        let service = Self::new();
        {
            let mut state = service.state.lock().unwrap();
            if let Some(path) = job.gcode_file_path.clone() {
                state.files.insert(path, gcode.as_bytes().to_vec());
            }
            state.queue.push(job);
        }
        service
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl JobService for MockJobService {
    async fn report_heartbeat(&self, status: DeviceStatus) -> Result<(), ServiceError> {
        self.state().heartbeats.push(status);
        Ok(())
    }

    async fn fetch_queue(&self) -> Result<Vec<Job>, ServiceError> {
        let mut state = self.state();
        state.queue_fetches += 1;
        Ok(state.queue.clone())
    }

    async fn notify_job_started(&self, job_id: u64, estimated_minutes: f64) -> Result<(), ServiceError> {
        let mut state = self.state();
        if state.reject_start {
            return Err(ServiceError::Status { status: 409, body: "not allowed".to_string() });
        }
        state.queue.retain(|j| j.id != job_id);
        state.started.push((job_id, estimated_minutes));
        Ok(())
    }

    async fn notify_job_finished(
        &self,
        job_id: u64,
        succeeded: bool,
        actual_material_grams: Option<f64>,
        error_message: Option<&str>,
    ) -> Result<(), ServiceError> {
        let mut state = self.state();
        state.queue.retain(|j| j.id != job_id);
        state.finished.push(Finished {
            job_id,
            succeeded,
            material: actual_material_grams,
            error: error_message.map(str::to_string),
        });
        Ok(())
    }

    async fn stream_download(
        &self,
        remote_path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, ServiceError> {
        let bytes = {
            let state = self.state();
            if state.fail_download {
                return Err(ServiceError::Timeout);
            }
            state.files.get(remote_path).cloned()
        };
        let bytes = bytes.ok_or(ServiceError::Status { status: 404, body: String::new() })?;
        for chunk in bytes.chunks(2048) {
            sink.write_all(chunk).await?;
        }
        sink.flush().await?;
        Ok(bytes.len() as u64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Menu { title: String, items: Vec<String>, selected: usize },
    Status(Vec<String>),
    Progress { title: String, percent: f64 },
}

/// Display that keeps every frame for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    pub frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingDisplay {
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Frame> {
        self.frames.lock().unwrap().last().cloned()
    }

    pub fn saw_status_line(&self, needle: &str) -> bool {
        self.frames().iter().any(|f| matches!(f, Frame::Status(lines) if lines.iter().any(|l| l.contains(needle))))
    }
}

impl Display for RecordingDisplay {
    fn clear(&mut self) {}

    fn render_menu(&mut self, title: &str, items: &[String], selected: usize) {
        self.frames.lock().unwrap().push(Frame::Menu {
            title: title.to_string(),
            items: items.to_vec(),
            selected,
        });
    }

    fn render_status(&mut self, lines: &[String]) {
        self.frames.lock().unwrap().push(Frame::Status(lines.to_vec()));
    }

    fn render_progress(&mut self, title: &str, percent: f64, _details: &[(String, String)]) {
        self.frames.lock().unwrap().push(Frame::Progress { title: title.to_string(), percent });
    }
}
