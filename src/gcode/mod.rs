// src/gcode/mod.rs - Job estimation: streaming parse with server fallback
pub mod estimator;

use std::path::Path;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::BufReader;

use crate::config::GcodeConfig;
use crate::service::models::Job;

pub use estimator::{estimate_stream, weight_from_extrusion, GcodeEstimator, GcodeTotals};

/// Used when neither the source nor the server gives a usable print time.
pub const FALLBACK_TIME_MINUTES: f64 = 30.0;
/// Used when neither the source nor the server gives a usable material amount.
pub const FALLBACK_MATERIAL_GRAMS: f64 = 10.0;
/// Layer count assumed for server-sourced estimates.
pub const FALLBACK_LAYERS: u32 = 100;

#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("IO error while reading G-code: {0}")]
    Io(#[from] std::io::Error),
    #[error("G-code source exceeds {limit} lines")]
    LineCeilingExceeded { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSource {
    Parsed,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimationResult {
    pub time_minutes: f64,
    pub extrusion_mm: f64,
    pub layers: u32,
    pub material_grams: f64,
    pub source: EstimateSource,
}

impl EstimationResult {
    /// Estimate declared by the job server.
    pub fn from_server(job: &Job) -> Self {
        Self {
            time_minutes: job.estimated_print_time_minutes,
            extrusion_mm: 0.0,
            layers: FALLBACK_LAYERS,
            material_grams: job.estimated_material_grams,
            source: EstimateSource::Server,
        }
    }

    /// Estimate derived from parsed totals and the job's filament.
    pub fn from_totals(totals: &GcodeTotals, job: &Job) -> Self {
        let material = &job.required_material;
        Self {
            time_minutes: totals.time_minutes,
            extrusion_mm: totals.extrusion_mm,
            layers: totals.layers,
            material_grams: weight_from_extrusion(
                totals.extrusion_mm,
                material.diameter_mm,
                material.density_g_per_cm3,
            ),
            source: EstimateSource::Parsed,
        }
    }

    /// Replace zero or unusable time/material so execution never divides by zero.
    /// Times above `max_minutes` count as unusable.
    pub fn with_usable_values(mut self, job: &Job, max_minutes: f64) -> Self {
        let plausible = |minutes: f64| usable(minutes) && minutes <= max_minutes;
        if !plausible(self.time_minutes) {
            if usable(self.time_minutes) {
                tracing::warn!("Job {} estimate of {:.0} min exceeds {:.0} min, ignoring it", job.id, self.time_minutes, max_minutes);
            }
            self.time_minutes = if plausible(job.estimated_print_time_minutes) {
                job.estimated_print_time_minutes
            } else {
                FALLBACK_TIME_MINUTES
            };
        }
        if !usable(self.material_grams) {
            self.material_grams = if usable(job.estimated_material_grams) {
                job.estimated_material_grams
            } else {
                FALLBACK_MATERIAL_GRAMS
            };
        }
        self
    }
}

fn usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Estimate a downloaded job. Never fails: any parse problem falls back to
/// the server-declared numbers.
pub async fn resolve_estimate(source: &Path, job: &Job, config: &GcodeConfig) -> EstimationResult {
    if config.skip_parsing {
        tracing::info!("G-code parsing disabled, using server estimate for job {}", job.id);
        return EstimationResult::from_server(job).with_usable_values(job, config.max_estimate_minutes);
    }

    let result = match File::open(source).await {
        Ok(file) => estimate_stream(BufReader::new(file), config.max_lines_to_parse).await,
        Err(e) => Err(EstimateError::Io(e)),
    };

    let estimate = match result {
        Ok(totals) => EstimationResult::from_totals(&totals, job),
        Err(e) => {
            tracing::warn!("G-code estimate failed for job {} ({}), using server estimate", job.id, e);
            EstimationResult::from_server(job)
        }
    };
    estimate.with_usable_values(job, config.max_estimate_minutes)
}
