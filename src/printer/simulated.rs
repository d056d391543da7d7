// src/printer/simulated.rs - Time-based printer simulation
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

use super::{PrintStatus, PrinterError, PrinterExecution, PrinterPhase};
use crate::config::SimulationConfig;

const AMBIENT_TEMP: f64 = 0.0;

#[derive(Debug, Clone, Default)]
struct PrinterState {
    is_executing: bool,
    job_id: Option<u64>,
    started_at: Option<Instant>,
    estimated_duration: Duration,
    total_layers: u32,
    estimated_material_g: f64,
    nozzle_temp: f64,
    bed_temp: f64,
    phase: PrinterPhase,
}

/// Printer whose progress is a linear function of wall time since the
/// heating ramp ended.
#[derive(Debug)]
pub struct SimulatedPrinter {
    config: SimulationConfig,
    state: PrinterState,
    pending_fault: Option<String>,
}

impl SimulatedPrinter {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            config: config.clone(),
            state: PrinterState::default(),
            pending_fault: None,
        }
    }

    /// Arm a fault that the next `error_probe` will report.
    pub fn inject_fault(&mut self, message: impl Into<String>) {
        self.pending_fault = Some(message.into());
    }

    async fn heat_up(&mut self) {
        let steps = self.config.heating_steps.max(1);
        let step = Duration::from_millis(self.config.heating_step_ms);
        let nozzle_target = self.config.nozzle_target_temp;
        let bed_target = self.config.bed_target_temp;

        for i in 1..=steps {
            let fraction = f64::from(i) / f64::from(steps);
            self.state.nozzle_temp = AMBIENT_TEMP + (nozzle_target - AMBIENT_TEMP) * fraction;
            self.state.bed_temp = AMBIENT_TEMP + (bed_target - AMBIENT_TEMP) * fraction;
            tracing::debug!("Heating {}/{}: nozzle {:.0}C bed {:.0}C", i, steps, self.state.nozzle_temp, self.state.bed_temp);
            tokio::time::sleep(step).await;
        }
        tracing::info!("Target temperatures reached: nozzle {:.0}C bed {:.0}C", nozzle_target, bed_target);
    }

    fn elapsed(&self) -> Duration {
        self.state.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn progress(&self) -> f64 {
        let duration = self.state.estimated_duration.as_secs_f64();
        if duration <= 0.0 {
            return 100.0;
        }
        (self.elapsed().as_secs_f64() / duration * 100.0).min(100.0)
    }
}

#[async_trait]
impl PrinterExecution for SimulatedPrinter {
    async fn start_print(
        &mut self,
        job_id: u64,
        estimated_minutes: f64,
        material_grams: f64,
        layers: u32,
    ) -> Result<(), PrinterError> {
        if self.state.is_executing || self.state.phase != PrinterPhase::Idle {
            return Err(PrinterError::Busy(self.state.job_id.unwrap_or(job_id)));
        }
        if !estimated_minutes.is_finite() || estimated_minutes <= 0.0 {
            return Err(PrinterError::InvalidParameters(format!(
                "estimated time must be positive, got {}",
                estimated_minutes
            )));
        }

        let duration_secs = estimated_minutes * 60.0 / self.config.speed_multiplier;
        let duration = Duration::try_from_secs_f64(duration_secs).map_err(|e| {
            PrinterError::InvalidParameters(format!("estimated time {} min is out of range: {}", estimated_minutes, e))
        })?;
        tracing::info!(
            "Starting job {}: {:.1} min estimate, {:.1}s simulated at {:.1}x, {} layers, {:.2} g",
            job_id, estimated_minutes, duration_secs, self.config.speed_multiplier, layers, material_grams
        );

        self.state = PrinterState {
            job_id: Some(job_id),
            phase: PrinterPhase::Heating,
            ..PrinterState::default()
        };
        self.heat_up().await;

        self.state.is_executing = true;
        self.state.started_at = Some(Instant::now());
        self.state.estimated_duration = duration;
        self.state.total_layers = layers;
        self.state.estimated_material_g = material_grams.max(0.0);
        self.state.phase = PrinterPhase::Executing;
        Ok(())
    }

    fn status(&self) -> PrintStatus {
        if !self.state.is_executing {
            return PrintStatus::default();
        }
        let progress = self.progress();
        let fraction = progress / 100.0;
        let elapsed = self.elapsed().as_secs_f64();
        PrintStatus {
            is_executing: true,
            job_id: self.state.job_id,
            progress,
            elapsed_secs: elapsed,
            remaining_secs: (self.state.estimated_duration.as_secs_f64() - elapsed).max(0.0),
            current_layer: (fraction * f64::from(self.state.total_layers)).floor() as u32,
            total_layers: self.state.total_layers,
            nozzle_temp: self.state.nozzle_temp,
            bed_temp: self.state.bed_temp,
            used_material_g: fraction * self.state.estimated_material_g,
        }
    }

    fn is_complete(&self) -> bool {
        self.state.is_executing && self.progress() >= 100.0
    }

    fn stop_print(&mut self) -> f64 {
        let used = self.status().used_material_g;
        if let Some(job_id) = self.state.job_id {
            tracing::info!("Job {} stopped, {:.2} g used", job_id, used);
        }
        self.state = PrinterState::default();
        used
    }

    fn error_probe(&mut self) -> Option<String> {
        if !self.state.is_executing {
            return None;
        }
        let fault = self.pending_fault.take().or_else(|| {
            let p = self.config.fault_probability.clamp(0.0, 1.0);
            (p > 0.0 && rand::rng().random_bool(p)).then(|| "simulated hardware fault".to_string())
        });
        if let Some(ref message) = fault {
            tracing::error!("Printer fault during job {:?}: {}", self.state.job_id, message);
            self.state.phase = PrinterPhase::Fault;
        }
        fault
    }

    fn is_executing(&self) -> bool {
        self.state.is_executing
    }

    fn phase(&self) -> PrinterPhase {
        match self.state.phase {
            PrinterPhase::Executing if self.is_complete() => PrinterPhase::Completing,
            phase => phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SimulationConfig {
        SimulationConfig { speed_multiplier: 1.0, ..SimulationConfig::default() }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_status_is_zeroed() {
        let printer = SimulatedPrinter::new(&fast_config());
        assert_eq!(printer.status(), PrintStatus::default());
        assert!(!printer.is_complete());
        assert_eq!(printer.phase(), PrinterPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn heats_to_targets_before_executing() {
        let mut printer = SimulatedPrinter::new(&fast_config());
        let before = Instant::now();
        printer.start_print(1, 1.0, 10.0, 50).await.unwrap();
        assert!(before.elapsed() >= Duration::from_millis(1000));

        let status = printer.status();
        assert_eq!(status.progress, 0.0);
        assert_eq!(status.current_layer, 0);
        assert_eq!(status.nozzle_temp, 210.0);
        assert_eq!(status.bed_temp, 60.0);
        assert_eq!(printer.phase(), PrinterPhase::Executing);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_linear_in_time() {
        let mut printer = SimulatedPrinter::new(&fast_config());
        printer.start_print(1, 1.0, 10.0, 50).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        let status = printer.status();
        assert!((status.progress - 50.0).abs() < 1e-6);
        assert_eq!(status.current_layer, 25);
        assert!((status.used_material_g - 5.0).abs() < 1e-6);
        assert!((status.remaining_secs - 30.0).abs() < 1e-6);
        assert!(!printer.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn progress_clamps_at_completion() {
        let mut printer = SimulatedPrinter::new(&fast_config());
        printer.start_print(1, 1.0, 10.0, 50).await.unwrap();

        tokio::time::advance(Duration::from_secs(90)).await;
        let status = printer.status();
        assert_eq!(status.progress, 100.0);
        assert_eq!(status.current_layer, 50);
        assert_eq!(status.remaining_secs, 0.0);
        assert!(printer.is_complete());
        assert_eq!(printer.phase(), PrinterPhase::Completing);
    }

    #[tokio::test(start_paused = true)]
    async fn speed_multiplier_shortens_duration() {
        let mut printer = SimulatedPrinter::new(&SimulationConfig::default());
        printer.start_print(1, 3.0, 10.0, 10).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(printer.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_second_job_while_busy() {
        let mut printer = SimulatedPrinter::new(&fast_config());
        printer.start_print(1, 1.0, 10.0, 50).await.unwrap();
        let err = printer.start_print(2, 1.0, 10.0, 50).await.unwrap_err();
        assert!(matches!(err, PrinterError::Busy(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_returns_material_and_resets() {
        let mut printer = SimulatedPrinter::new(&fast_config());
        printer.start_print(1, 1.0, 8.0, 50).await.unwrap();
        tokio::time::advance(Duration::from_secs(15)).await;

        let used = printer.stop_print();
        assert!((used - 2.0).abs() < 1e-6);
        assert!(!printer.is_executing());
        assert_eq!(printer.status(), PrintStatus::default());
    }

    #[tokio::test(start_paused = true)]
    async fn injected_fault_is_reported_once() {
        let mut printer = SimulatedPrinter::new(&fast_config());
        printer.start_print(1, 1.0, 8.0, 50).await.unwrap();
        assert_eq!(printer.error_probe(), None);

        printer.inject_fault("thermal runaway");
        assert_eq!(printer.error_probe().as_deref(), Some("thermal runaway"));
        assert_eq!(printer.phase(), PrinterPhase::Fault);
        assert_eq!(printer.error_probe(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn certain_fault_probability_always_fires() {
        let config = SimulationConfig { fault_probability: 1.0, ..fast_config() };
        let mut printer = SimulatedPrinter::new(&config);
        printer.start_print(1, 1.0, 8.0, 50).await.unwrap();
        assert!(printer.error_probe().is_some());
    }

    #[tokio::test]
    async fn rejects_non_positive_estimate() {
        let mut printer = SimulatedPrinter::new(&fast_config());
        let err = printer.start_print(1, 0.0, 8.0, 50).await.unwrap_err();
        assert!(matches!(err, PrinterError::InvalidParameters(_)));
        assert!(!printer.is_executing());
    }

    #[tokio::test]
    async fn rejects_estimate_too_long_to_schedule() {
        let mut printer = SimulatedPrinter::new(&fast_config());
        let err = printer.start_print(1, 1e300, 8.0, 50).await.unwrap_err();
        assert!(matches!(err, PrinterError::InvalidParameters(_)));
        assert!(!printer.is_executing());
        assert_eq!(printer.phase(), PrinterPhase::Idle);
    }
}
