//! In-process job server speaking the same REST API as the production one.
//! Used by the harness binary and the integration tests.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::service::models::{FinishJobRequest, Job, PingRequest, StartJobRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct FinishRecord {
    pub job_id: u64,
    pub is_success: bool,
    pub actual_material_in_grams: Option<f64>,
    pub error_message: Option<String>,
}

/// Everything the server has seen. Jobs move from `queue` to `running` on
/// start and out of `running` on finish.
#[derive(Debug, Clone, Default)]
pub struct JobServerState {
    pub printer_id: u64,
    pub queue: VecDeque<Job>,
    pub running: Vec<u64>,
    pub files: HashMap<String, Vec<u8>>,
    pub pings: Vec<String>,
    pub started: Vec<(u64, f64)>,
    pub finished: Vec<FinishRecord>,
    /// Job ids whose start request is answered with 409.
    pub reject_start: Vec<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct JobServer {
    state: Arc<Mutex<JobServerState>>,
}

type AppState = Arc<Mutex<JobServerState>>;

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    path: String,
}

impl JobServer {
    pub fn new(printer_id: u64) -> Self {
        let state = JobServerState { printer_id, ..JobServerState::default() };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Queue a job, registering its G-code under the job's path when given.
    pub async fn enqueue(&self, job: Job, gcode: Option<Vec<u8>>) {
        let mut state = self.state.lock().await;
        if let (Some(path), Some(bytes)) = (job.gcode_file_path.clone(), gcode) {
            state.files.insert(path, bytes);
        }
        state.queue.push_back(job);
    }

    pub async fn add_file(&self, path: impl Into<String>, bytes: Vec<u8>) {
        self.state.lock().await.files.insert(path.into(), bytes);
    }

    pub async fn reject_start_of(&self, job_id: u64) {
        self.state.lock().await.reject_start.push(job_id);
    }

    pub async fn snapshot(&self) -> JobServerState {
        self.state.lock().await.clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/Printer/files/download", get(download))
            .route("/api/Printer/{id}/ping", post(ping))
            .route("/api/Printer/{id}/queue", get(queue))
            .route("/api/Printer/{id}/jobs/{job}/start", post(start_job))
            .route("/api/Printer/{id}/jobs/{job}/finish", post(finish_job))
            .with_state(self.state.clone())
    }

    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        tracing::info!("Job server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router()).await
    }
}

fn known_printer(state: &JobServerState, id: u64) -> Result<(), StatusCode> {
    if state.printer_id == id { Ok(()) } else { Err(StatusCode::NOT_FOUND) }
}

async fn ping(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<PingRequest>,
) -> Result<StatusCode, StatusCode> {
    let mut state = state.lock().await;
    known_printer(&state, id)?;
    tracing::debug!("Ping from printer {}: {}", id, body.status);
    state.pings.push(body.status);
    Ok(StatusCode::OK)
}

async fn queue(State(state): State<AppState>, Path(id): Path<u64>) -> Result<impl IntoResponse, StatusCode> {
    let state = state.lock().await;
    known_printer(&state, id)?;
    let jobs: Vec<&Job> = state.queue.iter().collect();
    Ok(Json(json!({ "data": jobs })))
}

async fn start_job(
    State(state): State<AppState>,
    Path((id, job_id)): Path<(u64, u64)>,
    Json(body): Json<StartJobRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut state = state.lock().await;
    known_printer(&state, id).map_err(|s| (s, "unknown printer".to_string()))?;
    if state.reject_start.contains(&job_id) {
        return Err((StatusCode::CONFLICT, format!("job {} cannot be started", job_id)));
    }
    let Some(pos) = state.queue.iter().position(|j| j.id == job_id) else {
        return Err((StatusCode::NOT_FOUND, format!("job {} is not queued", job_id)));
    };
    state.queue.remove(pos);
    state.running.push(job_id);
    state.started.push((job_id, body.actual_estimated_time));
    tracing::info!("Job {} started, estimate {:.2} min", job_id, body.actual_estimated_time);
    Ok(StatusCode::OK)
}

async fn finish_job(
    State(state): State<AppState>,
    Path((id, job_id)): Path<(u64, u64)>,
    Json(body): Json<FinishJobRequest>,
) -> Result<StatusCode, StatusCode> {
    let mut state = state.lock().await;
    known_printer(&state, id)?;
    state.running.retain(|j| *j != job_id);
    // Jobs that fail before start are still queued; take them out.
    state.queue.retain(|j| j.id != job_id);
    tracing::info!("Job {} finished: success={} error={:?}", job_id, body.is_success, body.error_message);
    state.finished.push(FinishRecord {
        job_id,
        is_success: body.is_success,
        actual_material_in_grams: body.actual_material_in_grams,
        error_message: body.error_message,
    });
    Ok(StatusCode::OK)
}

async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let state = state.lock().await;
    let bytes = state.files.get(&query.path).cloned().ok_or(StatusCode::NOT_FOUND)?;
    Ok(([(header::CONTENT_TYPE, "text/plain")], bytes))
}

/// A small multi-layer G-code program: a square perimeter per layer.
pub fn sample_gcode(layers: u32) -> String {
    let mut out = String::from("; sample part\nG28\nG92 E0\nM104 S210\n");
    let mut e = 0.0;
    for layer in 1..=layers {
        let z = f64::from(layer) * 0.2;
        out.push_str(&format!("G1 Z{:.2} F600 ; layer {}\n", z, layer));
        for (x, y) in [(20.0, 0.0), (20.0, 20.0), (0.0, 20.0), (0.0, 0.0)] {
            e += 0.8;
            out.push_str(&format!("G1 X{} Y{} E{:.3} F1800\n", x, y, e));
        }
    }
    out.push_str("G1 E-1 F2400\nM104 S0\n");
    out
}
