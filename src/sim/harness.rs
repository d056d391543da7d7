//! End-to-end demo: an in-process job server plus the full device loop
//! (HTTP client, simulated printer, emulated LCD) processing a batch of jobs.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use krusty_node::config::Config;
use krusty_node::control::buttons::KeyboardButtons;
use krusty_node::control::ControlLoop;
use krusty_node::logging::init_logging;
use krusty_node::print_job::{JobOutcome, Orchestrator};
use krusty_node::printer::SimulatedPrinter;
use krusty_node::service::{HttpJobService, Job};
use krusty_node::sim::{sample_gcode, JobServer};
use krusty_node::ui::{CharacterLcd, ConsoleDriver};

/// Simulation Harness CLI
#[derive(Parser, Debug)]
#[command(name = "sim-harness", about = "Run the printer client against a local job server.")]
struct Cli {
    /// Number of jobs to queue
    #[arg(long, default_value_t = 3)]
    jobs: u32,

    /// G-code file to print (defaults to a generated sample part)
    #[arg(long)]
    gcode: Option<PathBuf>,

    /// Simulation speed multiplier
    #[arg(long, default_value_t = 60.0)]
    speed: f64,

    /// Optional TOML config used as the base before harness overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut config = match cli.config {
        Some(ref path) => krusty_node::config::load_config(path).map_err(|e| {
            tracing::error!("Failed to load config {}: {}", path.display(), e);
            e
        })?,
        None => Config::default(),
    };

    let gcode = match cli.gcode {
        Some(ref path) => tokio::fs::read(path).await?,
        None => sample_gcode(20).into_bytes(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = JobServer::new(config.server.printer_id);
    for i in 1..=u64::from(cli.jobs) {
        let mut job = Job::new(i, format!("jobs/part_{}.gcode", i));
        job.estimated_print_time_minutes = 5.0;
        job.estimated_material_grams = 2.0;
        server.enqueue(job, Some(gcode.clone())).await;
    }
    let serve = server.clone();
    tokio::spawn(async move {
        if let Err(e) = serve.serve(listener).await {
            tracing::error!("Job server stopped: {}", e);
        }
    });

    let cache = tempfile::tempdir()?;
    config.server.base_url = format!("http://{}", addr);
    config.gcode.cache_dir = cache.path().to_path_buf();
    config.simulation.speed_multiplier = cli.speed;
    config.simulation.heating_step_ms = 20;
    config.timing.ping_interval_secs = 5.0;
    config.timing.queue_poll_interval_secs = 0.5;
    config.timing.monitor_interval_secs = 0.5;
    config.ui.message_hold_ms = 200;
    config.validate()?;

    let service = Arc::new(HttpJobService::new(&config.server)?);
    let printer = Box::new(SimulatedPrinter::new(&config.simulation));
    let orchestrator = Orchestrator::new(service, printer, &config);
    let display = Box::new(CharacterLcd::new(ConsoleDriver::new()));
    let (_keys, buttons) = KeyboardButtons::channel();
    let mut device = ControlLoop::new(orchestrator, display, Box::new(buttons), &config);

    device.startup().await;
    device.enter_polling();

    let mut completed = 0;
    let mut failed = 0;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(600);
    while completed + failed < cli.jobs && tokio::time::Instant::now() < deadline {
        match device.tick().await {
            Some(JobOutcome::Completed { .. }) => completed += 1,
            Some(JobOutcome::Failed { .. }) => failed += 1,
            Some(JobOutcome::Rejected) | None => {}
        }
    }
    device.shutdown().await;

    let state = server.snapshot().await;
    tracing::info!(
        "Harness done: {} completed, {} failed, {} pings, {} left in queue",
        completed, failed, state.pings.len(), state.queue.len()
    );
    for record in &state.finished {
        tracing::info!(
            "  job {}: success={} material={:?} error={:?}",
            record.job_id, record.is_success, record.actual_material_in_grams, record.error_message
        );
    }
    Ok(())
}
