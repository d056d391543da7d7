// src/print_job.rs - Job orchestration: download, estimate, execute, report
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, GcodeConfig};
use crate::control::rate_limiter::RateLimiter;
use crate::file_manager::{FileManager, JobArtifact};
use crate::gcode::{self, EstimationResult};
use crate::printer::{PrinterError, PrinterExecution, PrinterPhase};
use crate::service::{DeviceStatus, Job, JobService, ServiceError};
use crate::statistics::Statistics;
use crate::ui::{Display, Language, Text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Idle,
    Downloading,
    Parsing,
    Validating,
    Starting,
    Monitoring,
    Finishing,
    ErrorReporting,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStage::Idle => "Idle",
            JobStage::Downloading => "[1/7] Downloading...",
            JobStage::Parsing => "[2/7] Parsing...",
            JobStage::Validating => "[3/7] Validating...",
            JobStage::Starting => "[4/7] Starting...",
            JobStage::Monitoring => "[5/7] Printing...",
            JobStage::Finishing => "[6/7] Finishing...",
            JobStage::ErrorReporting => "Reporting error",
        };
        f.write_str(label)
    }
}

/// Why a job was aborted before the print ran to an end. The display text is
/// what the server receives as the error message.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("download failed")]
    MissingPath,
    #[error("download failed")]
    Artifact(#[source] std::io::Error),
    #[error("download failed")]
    Download(#[source] ServiceError),
    #[error("server rejected start")]
    StartRejected(#[source] ServiceError),
    #[error("printer start failed")]
    PrinterStart(#[source] PrinterError),
}

impl StageError {
    pub fn stage(&self) -> JobStage {
        match self {
            StageError::MissingPath | StageError::Artifact(_) | StageError::Download(_) => JobStage::Downloading,
            StageError::StartRejected(_) | StageError::PrinterStart(_) => JobStage::Starting,
        }
    }

    fn detail(&self) -> String {
        match self {
            StageError::MissingPath => "job has no G-code path".to_string(),
            StageError::Artifact(e) => format!("cache file: {}", e),
            StageError::Download(e) | StageError::StartRejected(e) => e.to_string(),
            StageError::PrinterStart(e) => e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed { material_grams: f64 },
    Failed { reason: String },
    Rejected,
}

/// Runs one job at a time against a job service and a printer.
pub struct Orchestrator {
    service: Arc<dyn JobService>,
    printer: Box<dyn PrinterExecution>,
    files: FileManager,
    gcode: GcodeConfig,
    monitor_interval: Duration,
    message_hold: Duration,
    heartbeat: RateLimiter,
    status: DeviceStatus,
    stage: JobStage,
    statistics: Statistics,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn JobService>, printer: Box<dyn PrinterExecution>, config: &Config) -> Self {
        Self {
            service,
            printer,
            files: FileManager::new(config.gcode.cache_dir.clone()),
            gcode: config.gcode.clone(),
            monitor_interval: config.timing.monitor_interval(),
            message_hold: Duration::from_millis(config.ui.message_hold_ms),
            heartbeat: RateLimiter::new(config.timing.ping_interval()),
            status: DeviceStatus::Idle,
            stage: JobStage::Idle,
            statistics: Statistics::new(),
        }
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub fn is_busy(&self) -> bool {
        self.printer.is_executing()
    }

    pub fn service(&self) -> &Arc<dyn JobService> {
        &self.service
    }

    /// Heartbeat with the current status if the ping interval has elapsed.
    pub async fn send_heartbeat(&mut self) {
        if self.heartbeat.check_and_mark() {
            self.report_status().await;
        }
    }

    /// Heartbeat now, regardless of the interval, and restart the interval.
    pub async fn send_heartbeat_now(&mut self) {
        self.heartbeat.mark();
        self.report_status().await;
    }

    /// Drop whatever job is in flight without reporting it and return to idle.
    pub fn abort_current(&mut self) {
        if self.printer.is_executing() || self.printer.phase() != PrinterPhase::Idle {
            let used = self.printer.stop_print();
            tracing::warn!("Aborted running job, {:.2} g used", used);
        }
        self.status = DeviceStatus::Idle;
        self.stage = JobStage::Idle;
    }

    async fn report_status(&self) {
        if let Err(e) = self.service.report_heartbeat(self.status).await {
            tracing::debug!("Heartbeat '{}' not delivered: {}", self.status, e);
        }
    }

    /// Take one job from acquisition to report. Never panics and never
    /// returns an error: every failure is reported to the server and ends
    /// up in the outcome.
    pub async fn process_job(&mut self, job: &Job, display: &mut dyn Display, language: Language) -> JobOutcome {
        if self.printer.is_executing() {
            tracing::warn!("Job {} refused: printer is busy", job.id);
            return JobOutcome::Rejected;
        }

        tracing::info!(
            "Processing job {}: {} {}, server estimate {:.2} g",
            job.id, job.required_material.material_type, job.required_material.color, job.estimated_material_grams
        );
        display.render_status(&[
            format!("{} #{}", language.text(Text::Job), job.id),
            language.text(Text::Initializing).to_string(),
        ]);

        let outcome = match self.run_stages(job, display, language).await {
            Ok(fault) => self.finish_print(job, fault, display, language).await,
            Err(e) => self.report_error(job, e, display, language).await,
        };

        tracing::info!("[7/7] Cleanup for job {} complete", job.id);
        self.status = DeviceStatus::Idle;
        self.stage = JobStage::Idle;
        outcome
    }

    /// Download through monitoring. `Ok` carries the hardware fault, if any.
    async fn run_stages(
        &mut self,
        job: &Job,
        display: &mut dyn Display,
        language: Language,
    ) -> Result<Option<String>, StageError> {
        self.enter(JobStage::Downloading, job, display, language);
        let artifact = self.download(job).await?;

        self.enter(JobStage::Parsing, job, display, language);
        let estimate = gcode::resolve_estimate(artifact.path(), job, &self.gcode).await;
        tracing::info!(
            "Estimate for job {} ({:?}): {:.2} min, {:.2} g, {} layers",
            job.id, estimate.source, estimate.time_minutes, estimate.material_grams, estimate.layers
        );

        self.enter(JobStage::Validating, job, display, language);
        self.validate(job, &estimate);

        self.enter(JobStage::Starting, job, display, language);
        self.start(job, &estimate).await?;

        self.enter(JobStage::Monitoring, job, display, language);
        Ok(self.monitor(display, language).await)
    }

    fn enter(&mut self, stage: JobStage, job: &Job, display: &mut dyn Display, language: Language) {
        tracing::info!("Job {}: {}", job.id, stage);
        self.stage = stage;
        if stage != JobStage::Monitoring {
            display.render_status(&[format!("{} #{}", language.text(Text::Job), job.id), stage.to_string()]);
        }
    }

    async fn download(&self, job: &Job) -> Result<JobArtifact, StageError> {
        let path = job
            .gcode_file_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(StageError::MissingPath)?;

        let artifact = self.files.create_artifact(job.id).await.map_err(StageError::Artifact)?;
        let mut writer = artifact.writer().map_err(StageError::Artifact)?;
        let bytes = self.service.stream_download(path, &mut writer).await.map_err(StageError::Download)?;
        tracing::info!("Job {}: {} bytes cached at {}", job.id, bytes, artifact.path().display());
        Ok(artifact)
    }

    fn validate(&self, job: &Job, estimate: &EstimationResult) {
        tracing::info!(
            "Job {}: material required {:.2} g, server estimate {:.2} g",
            job.id, estimate.material_grams, job.estimated_material_grams
        );
    }

    async fn start(&mut self, job: &Job, estimate: &EstimationResult) -> Result<(), StageError> {
        self.service
            .notify_job_started(job.id, estimate.time_minutes)
            .await
            .map_err(StageError::StartRejected)?;

        self.status = DeviceStatus::Printing;
        self.printer
            .start_print(job.id, estimate.time_minutes, estimate.material_grams, estimate.layers)
            .await
            .map_err(StageError::PrinterStart)?;
        self.statistics.start_job(estimate.material_grams);
        Ok(())
    }

    async fn monitor(&mut self, display: &mut dyn Display, language: Language) -> Option<String> {
        while self.printer.is_executing() {
            let status = self.printer.status();
            tracing::debug!(
                "Progress {:.1}% | layer {}/{} | {:.0}s elapsed, {:.0}s left | {:.1} g",
                status.progress, status.current_layer, status.total_layers,
                status.elapsed_secs, status.remaining_secs, status.used_material_g
            );
            display.render_progress(
                language.text(Text::Printing),
                status.progress,
                &[
                    (
                        language.text(Text::Layer).to_string(),
                        format!("{}/{}", status.current_layer, status.total_layers),
                    ),
                    (
                        language.text(Text::TimeLeft).to_string(),
                        format!("{}{}", (status.remaining_secs / 60.0) as u64, language.text(Text::Minutes)),
                    ),
                ],
            );

            self.send_heartbeat().await;

            if let Some(fault) = self.printer.error_probe() {
                self.status = DeviceStatus::Error;
                self.send_heartbeat_now().await;
                return Some(fault);
            }
            if self.printer.is_complete() {
                tracing::info!("Print complete");
                return None;
            }

            tokio::time::sleep(self.monitor_interval).await;
        }
        None
    }

    async fn finish_print(
        &mut self,
        job: &Job,
        fault: Option<String>,
        display: &mut dyn Display,
        language: Language,
    ) -> JobOutcome {
        self.stage = JobStage::Finishing;
        tracing::info!("Job {}: {}", job.id, JobStage::Finishing);

        let actual = self.printer.stop_print();
        let succeeded = fault.is_none();
        let error_message = fault.map(|f| format!("print failed: {}", f));

        if let Err(e) = self
            .service
            .notify_job_finished(job.id, succeeded, Some(actual), error_message.as_deref())
            .await
        {
            tracing::error!("Job {}: completion report not delivered: {}", job.id, e);
        }
        self.statistics.finish_job(succeeded, Some(actual));

        let title = format!("{} #{}", language.text(Text::Job), job.id);
        let outcome = match error_message {
            None => {
                tracing::info!("Job {} finished successfully, {:.2} g used", job.id, actual);
                display.render_status(&[
                    title,
                    language.text(Text::Successful).to_string(),
                    format!("{}: {:.1}{}", language.text(Text::Material), actual, language.text(Text::Grams)),
                ]);
                JobOutcome::Completed { material_grams: actual }
            }
            Some(reason) => {
                tracing::warn!("Job {} finished with errors: {}", job.id, reason);
                display.render_status(&[title, language.text(Text::Failed).to_string(), reason.clone()]);
                JobOutcome::Failed { reason }
            }
        };
        tokio::time::sleep(self.message_hold).await;
        outcome
    }

    async fn report_error(
        &mut self,
        job: &Job,
        error: StageError,
        display: &mut dyn Display,
        language: Language,
    ) -> JobOutcome {
        self.stage = JobStage::ErrorReporting;
        let message = error.to_string();
        tracing::error!("Job {} aborted during {:?}: {} ({})", job.id, error.stage(), message, error.detail());

        if let Err(e) = self.service.notify_job_finished(job.id, false, None, Some(&message)).await {
            tracing::error!("Job {}: failure report not delivered: {}", job.id, e);
        }
        self.statistics.finish_job(false, None);

        display.render_status(&[language.text(Text::Error).to_string(), message.clone()]);
        tokio::time::sleep(self.message_hold).await;
        JobOutcome::Failed { reason: message }
    }
}
