// src/statistics.rs - In-memory job counters
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// Running totals since boot. Nothing is persisted.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub total_jobs: u32,
    pub successful_jobs: u32,
    pub failed_jobs: u32,
    /// Seconds between `start_job` and `finish_job`, summed.
    pub total_print_time: f64,
    pub total_material_grams: f64,
    started_at: DateTime<Utc>,
    boot: Instant,
    current_job_start: Option<Instant>,
    current_estimated_grams: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsSummary {
    pub total_jobs: u32,
    pub successful_jobs: u32,
    pub failed_jobs: u32,
    pub success_rate: f64,
    pub total_material_grams: f64,
    pub print_time_hours: u64,
    pub print_time_minutes: u64,
    pub uptime_hours: u64,
    pub uptime_minutes: u64,
    pub started_at: DateTime<Utc>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            total_jobs: 0,
            successful_jobs: 0,
            failed_jobs: 0,
            total_print_time: 0.0,
            total_material_grams: 0.0,
            started_at: Utc::now(),
            boot: Instant::now(),
            current_job_start: None,
            current_estimated_grams: 0.0,
        }
    }

    pub fn start_job(&mut self, estimated_grams: f64) {
        self.current_job_start = Some(Instant::now());
        self.current_estimated_grams = estimated_grams;
    }

    /// Close the current job. `actual_grams` wins over the estimate whenever
    /// it is present, including an explicit zero. Jobs that fail before
    /// `start_job` still count.
    pub fn finish_job(&mut self, success: bool, actual_grams: Option<f64>) {
        self.total_jobs += 1;
        if success {
            self.successful_jobs += 1;
        } else {
            self.failed_jobs += 1;
        }

        let grams = actual_grams.unwrap_or(self.current_estimated_grams);
        if grams.is_finite() && grams > 0.0 {
            self.total_material_grams += grams;
        }

        if let Some(start) = self.current_job_start.take() {
            self.total_print_time += start.elapsed().as_secs_f64();
        }
        self.current_estimated_grams = 0.0;
    }

    pub fn uptime(&self) -> Duration {
        self.boot.elapsed()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_jobs == 0 {
            0.0
        } else {
            f64::from(self.successful_jobs) / f64::from(self.total_jobs) * 100.0
        }
    }

    pub fn summary(&self) -> StatisticsSummary {
        let print_secs = self.total_print_time.max(0.0) as u64;
        let uptime_secs = self.uptime().as_secs();
        StatisticsSummary {
            total_jobs: self.total_jobs,
            successful_jobs: self.successful_jobs,
            failed_jobs: self.failed_jobs,
            success_rate: self.success_rate(),
            total_material_grams: self.total_material_grams,
            print_time_hours: print_secs / 3600,
            print_time_minutes: (print_secs % 3600) / 60,
            uptime_hours: uptime_secs / 3600,
            uptime_minutes: (uptime_secs % 3600) / 60,
            started_at: self.started_at,
        }
    }

    pub fn log_summary(&self) {
        let s = self.summary();
        tracing::info!(
            "Statistics: {} jobs ({} ok, {} failed, {:.1}%), {:.2} g, print time {}h {}m, uptime {}h {}m",
            s.total_jobs, s.successful_jobs, s.failed_jobs, s.success_rate, s.total_material_grams,
            s.print_time_hours, s.print_time_minutes, s.uptime_hours, s.uptime_minutes
        );
    }
}
