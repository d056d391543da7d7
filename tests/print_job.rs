mod common;

use async_trait::async_trait;
use std::sync::Arc;

use common::{Frame, MockJobService, RecordingDisplay};
use krusty_node::config::Config;
use krusty_node::file_manager::FileManager;
use krusty_node::gcode::FALLBACK_TIME_MINUTES;
use krusty_node::print_job::{JobOutcome, JobStage, Orchestrator};
use krusty_node::printer::{PrintStatus, PrinterError, PrinterExecution, PrinterPhase, SimulatedPrinter};
use krusty_node::service::{DeviceStatus, Job};
use krusty_node::sim::sample_gcode;
use krusty_node::ui::Language;

fn test_config(cache: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.gcode.cache_dir = cache.to_path_buf();
    config.ui.message_hold_ms = 10;
    config
}

fn orchestrator(service: Arc<MockJobService>, config: &Config) -> Orchestrator {
    let printer = Box::new(SimulatedPrinter::new(&config.simulation));
    Orchestrator::new(service, printer, config)
}

fn job(id: u64) -> Job {
    let mut job = Job::new(id, format!("jobs/{}.gcode", id));
    job.estimated_print_time_minutes = 42.0;
    job.estimated_material_grams = 7.5;
    job
}

async fn cached_files(config: &Config) -> usize {
    FileManager::new(config.gcode.cache_dir.clone()).list_files().await.unwrap().len()
}

#[tokio::test(start_paused = true)]
async fn test_successful_job_reports_actual_material() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let service = MockJobService::with_job(job(1), &sample_gcode(10));
    let mut orch = orchestrator(service.clone(), &config);
    let mut display = RecordingDisplay::default();

    let outcome = orch.process_job(&job(1), &mut display, Language::En).await;

    let JobOutcome::Completed { material_grams } = outcome else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert!(material_grams > 0.0);

    let state = service.state();
    assert_eq!(state.started.len(), 1);
    assert_ne!(state.started[0].1, 42.0, "parsed estimate should replace the server one");
    assert_eq!(state.finished.len(), 1);
    assert!(state.finished[0].succeeded);
    assert_eq!(state.finished[0].material, Some(material_grams));
    assert_eq!(state.finished[0].error, None);
    assert!(state.heartbeats.contains(&DeviceStatus::Printing));
    drop(state);

    let stats = orch.statistics();
    assert_eq!(stats.successful_jobs, 1);
    assert_eq!(stats.total_jobs, 1);
    assert!((stats.total_material_grams - material_grams).abs() < 1e-9);
    assert_eq!(orch.status(), DeviceStatus::Idle);
    assert_eq!(orch.stage(), JobStage::Idle);
    assert!(!orch.is_busy());
    assert_eq!(cached_files(&config).await, 0);

    assert!(display.frames().iter().any(|f| matches!(f, Frame::Progress { .. })));
    assert!(display.saw_status_line("Successful"));
}

#[tokio::test(start_paused = true)]
async fn test_parse_failure_uses_server_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.gcode.max_lines_to_parse = 3;
    let service = MockJobService::with_job(job(2), &sample_gcode(10));
    let mut orch = orchestrator(service.clone(), &config);

    let outcome = orch.process_job(&job(2), &mut RecordingDisplay::default(), Language::En).await;

    assert!(matches!(outcome, JobOutcome::Completed { .. }));
    assert_eq!(service.state().started, vec![(2, 42.0)]);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_parsing_without_server_estimate_uses_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.gcode.skip_parsing = true;
    let bare = Job::new(3, "jobs/3.gcode");
    let service = MockJobService::with_job(bare.clone(), "G1 X1\n");
    let mut orch = orchestrator(service.clone(), &config);

    orch.process_job(&bare, &mut RecordingDisplay::default(), Language::En).await;

    assert_eq!(service.state().started, vec![(3, FALLBACK_TIME_MINUTES)]);
}

#[tokio::test(start_paused = true)]
async fn test_download_failure_reports_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let service = MockJobService::with_job(job(4), "G1 X1\n");
    service.state().fail_download = true;
    let mut orch = orchestrator(service.clone(), &config);
    let mut display = RecordingDisplay::default();

    let outcome = orch.process_job(&job(4), &mut display, Language::En).await;

    assert_eq!(outcome, JobOutcome::Failed { reason: "download failed".to_string() });
    let state = service.state();
    assert!(state.started.is_empty());
    assert_eq!(state.finished.len(), 1);
    assert!(!state.finished[0].succeeded);
    assert_eq!(state.finished[0].material, None);
    assert_eq!(state.finished[0].error.as_deref(), Some("download failed"));
    drop(state);

    assert_eq!(orch.statistics().failed_jobs, 1);
    assert_eq!(orch.statistics().total_material_grams, 0.0);
    assert_eq!(cached_files(&config).await, 0);
    assert_eq!(display.last(), Some(Frame::Status(vec!["Error".to_string(), "download failed".to_string()])));
}

#[tokio::test(start_paused = true)]
async fn test_missing_gcode_path_is_a_download_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut pathless = job(5);
    pathless.gcode_file_path = None;
    let service = MockJobService::new();
    let mut orch = orchestrator(service.clone(), &config);

    let outcome = orch.process_job(&pathless, &mut RecordingDisplay::default(), Language::En).await;

    assert_eq!(outcome, JobOutcome::Failed { reason: "download failed".to_string() });
    assert_eq!(service.state().finished[0].job_id, 5);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_start_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let service = MockJobService::with_job(job(6), &sample_gcode(2));
    service.state().reject_start = true;
    let mut orch = orchestrator(service.clone(), &config);

    let outcome = orch.process_job(&job(6), &mut RecordingDisplay::default(), Language::En).await;

    assert_eq!(outcome, JobOutcome::Failed { reason: "server rejected start".to_string() });
    assert!(!orch.is_busy());
    let error = service.state().finished[0].error.clone();
    assert_eq!(error.as_deref(), Some("server rejected start"));
    assert_eq!(cached_files(&config).await, 0);

    let stats = orch.statistics();
    assert_eq!(stats.failed_jobs, 1);
    assert_eq!(stats.total_material_grams, 0.0);
    assert_eq!(stats.total_print_time, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_huge_coordinate_falls_back_to_server_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let service = MockJobService::with_job(job(11), "G1 X1e150 E5\n");
    let mut orch = orchestrator(service.clone(), &config);

    let outcome = orch.process_job(&job(11), &mut RecordingDisplay::default(), Language::En).await;

    assert!(matches!(outcome, JobOutcome::Completed { .. }), "{:?}", outcome);
    assert_eq!(service.state().started, vec![(11, 42.0)]);
    assert_eq!(orch.status(), DeviceStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_printer_fault_finishes_job_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.simulation.fault_probability = 1.0;
    let service = MockJobService::with_job(job(7), &sample_gcode(5));
    let mut orch = orchestrator(service.clone(), &config);

    let outcome = orch.process_job(&job(7), &mut RecordingDisplay::default(), Language::En).await;

    let JobOutcome::Failed { reason } = outcome else {
        panic!("expected failure");
    };
    assert_eq!(reason, "print failed: simulated hardware fault");
    let state = service.state();
    assert!(!state.finished[0].succeeded);
    assert!(state.finished[0].material.is_some());
    assert_eq!(state.finished[0].error.as_deref(), Some(reason.as_str()));
    assert!(state.heartbeats.contains(&DeviceStatus::Error));
    drop(state);
    assert_eq!(orch.statistics().failed_jobs, 1);
    assert_eq!(orch.status(), DeviceStatus::Idle);
}

struct BusyPrinter;

#[async_trait]
impl PrinterExecution for BusyPrinter {
    async fn start_print(&mut self, job_id: u64, _: f64, _: f64, _: u32) -> Result<(), PrinterError> {
        Err(PrinterError::Busy(job_id))
    }
    fn status(&self) -> PrintStatus {
        PrintStatus { is_executing: true, ..PrintStatus::default() }
    }
    fn is_complete(&self) -> bool {
        false
    }
    fn stop_print(&mut self) -> f64 {
        0.0
    }
    fn error_probe(&mut self) -> Option<String> {
        None
    }
    fn is_executing(&self) -> bool {
        true
    }
    fn phase(&self) -> PrinterPhase {
        PrinterPhase::Executing
    }
}

#[tokio::test]
async fn test_busy_printer_refuses_job() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let service = MockJobService::with_job(job(8), "G1 X1\n");
    let mut orch = Orchestrator::new(service.clone(), Box::new(BusyPrinter), &config);

    let outcome = orch.process_job(&job(8), &mut RecordingDisplay::default(), Language::En).await;

    assert_eq!(outcome, JobOutcome::Rejected);
    let state = service.state();
    assert!(state.started.is_empty());
    assert!(state.finished.is_empty());
    assert_eq!(orch.statistics().total_jobs, 0);
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_jobs_accumulate_actual_material() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let service = MockJobService::with_job(job(9), &sample_gcode(4));
    service.state().files.insert("jobs/10.gcode".to_string(), sample_gcode(8).into_bytes());
    let mut orch = orchestrator(service.clone(), &config);

    let mut total = 0.0;
    for id in [9, 10] {
        match orch.process_job(&job(id), &mut RecordingDisplay::default(), Language::En).await {
            JobOutcome::Completed { material_grams } => total += material_grams,
            other => panic!("job {} ended with {:?}", id, other),
        }
    }

    let stats = orch.statistics();
    assert_eq!(stats.successful_jobs, 2);
    assert!((stats.total_material_grams - total).abs() < 1e-9);
    assert!((stats.total_material_grams - 2.0 * 7.5).abs() > 1e-6, "estimates must not be counted");
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_is_rate_limited() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let service = MockJobService::new();
    let mut orch = orchestrator(service.clone(), &config);

    orch.send_heartbeat().await;
    orch.send_heartbeat().await;
    assert_eq!(service.state().heartbeats, vec![DeviceStatus::Idle]);

    tokio::time::advance(config.timing.ping_interval()).await;
    orch.send_heartbeat().await;
    orch.send_heartbeat_now().await;
    assert_eq!(service.state().heartbeats.len(), 3);
}
