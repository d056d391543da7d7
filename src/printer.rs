// src/printer.rs - Printer execution interface and status snapshots
pub mod simulated;

use async_trait::async_trait;
use thiserror::Error;

pub use simulated::SimulatedPrinter;

#[derive(Debug, Error)]
pub enum PrinterError {
    #[error("Printer is already executing job {0}")]
    Busy(u64),
    #[error("Invalid print parameters: {0}")]
    InvalidParameters(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrinterPhase {
    #[default]
    Idle,
    Heating,
    Executing,
    Completing,
    Fault,
}

/// Point-in-time view of a running print. All zeros when idle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PrintStatus {
    pub is_executing: bool,
    pub job_id: Option<u64>,
    /// 0..=100
    pub progress: f64,
    pub elapsed_secs: f64,
    pub remaining_secs: f64,
    pub current_layer: u32,
    pub total_layers: u32,
    pub nozzle_temp: f64,
    pub bed_temp: f64,
    pub used_material_g: f64,
}

/// What the orchestrator needs from a printer.
///
/// `status` and `is_complete` are pure reads; only `start_print`,
/// `stop_print` and `error_probe` change state.
#[async_trait]
pub trait PrinterExecution: Send + Sync {
    async fn start_print(
        &mut self,
        job_id: u64,
        estimated_minutes: f64,
        material_grams: f64,
        layers: u32,
    ) -> Result<(), PrinterError>;

    fn status(&self) -> PrintStatus;

    fn is_complete(&self) -> bool;

    /// Return to idle and report the material consumed so far.
    fn stop_print(&mut self) -> f64;

    /// Hardware fault description, if one has occurred since the last call.
    fn error_probe(&mut self) -> Option<String>;

    fn is_executing(&self) -> bool;

    fn phase(&self) -> PrinterPhase;
}
