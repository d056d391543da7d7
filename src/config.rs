//! # Client Configuration
//!
//! Everything the node needs to know about the job server, polling cadence,
//! G-code handling, the printer simulation and the local UI lives in a single
//! TOML file. Every field has a default, so an empty file (or no file at all)
//! yields a working configuration.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [server]
//! base_url = "http://192.168.1.20:5000"
//! printer_id = 3
//!
//! [timing]
//! ping_interval_secs = 60
//! queue_poll_interval_secs = 5
//!
//! [gcode]
//! max_lines_to_parse = 20000
//!
//! [simulation]
//! speed_multiplier = 10.0
//! ```
//!
//! ## Example: Rust Usage
//!
//! ```rust
//! use krusty_node::config::Config;
//! let config: Config = toml::from_str("[server]\nprinter_id = 3\n").unwrap();
//! assert_eq!(config.server.printer_id, 3);
//! assert_eq!(config.gcode.max_lines_to_parse, 50_000);
//! assert!(config.validate().is_ok());
//! ```

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the job server link, timing, G-code, simulation and UI.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub gcode: GcodeConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Job server connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_printer_id")]
    pub printer_id: u64,
    /// Timeout for ping, queue and start requests.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_finish_timeout")]
    pub finish_timeout_secs: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    /// Largest slice written to the local sink per write during a download.
    #[serde(default = "default_chunk_size")]
    pub download_chunk_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            printer_id: default_printer_id(),
            request_timeout_secs: default_request_timeout(),
            finish_timeout_secs: default_finish_timeout(),
            download_timeout_secs: default_download_timeout(),
            download_chunk_size: default_chunk_size(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn finish_timeout(&self) -> Duration {
        Duration::from_secs(self.finish_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Polling cadence of the control loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: f64,
    #[serde(default = "default_queue_poll_interval")]
    pub queue_poll_interval_secs: f64,
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: f64,
    #[serde(default = "default_menu_tick_ms")]
    pub menu_tick_ms: u64,
    #[serde(default = "default_polling_tick_ms")]
    pub polling_tick_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            queue_poll_interval_secs: default_queue_poll_interval(),
            monitor_interval_secs: default_monitor_interval(),
            menu_tick_ms: default_menu_tick_ms(),
            polling_tick_ms: default_polling_tick_ms(),
        }
    }
}

impl TimingConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs_f64(self.ping_interval_secs)
    }

    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.queue_poll_interval_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs_f64(self.monitor_interval_secs)
    }

    pub fn menu_tick(&self) -> Duration {
        Duration::from_millis(self.menu_tick_ms)
    }

    pub fn polling_tick(&self) -> Duration {
        Duration::from_millis(self.polling_tick_ms)
    }
}

/// G-code download and estimation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GcodeConfig {
    /// Sources with more significant lines than this use the server estimate.
    #[serde(default = "default_max_lines")]
    pub max_lines_to_parse: usize,
    #[serde(default)]
    pub skip_parsing: bool,
    /// Print time estimates above this many minutes are treated as unusable.
    #[serde(default = "default_max_estimate_minutes")]
    pub max_estimate_minutes: f64,
    /// Directory holding the downloaded job while it runs.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for GcodeConfig {
    fn default() -> Self {
        Self {
            max_lines_to_parse: default_max_lines(),
            skip_parsing: false,
            max_estimate_minutes: default_max_estimate_minutes(),
            cache_dir: default_cache_dir(),
        }
    }
}

/// Printer simulation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Acceleration factor applied to print durations. Real hardware uses 1.0.
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,
    #[serde(default = "default_heating_steps")]
    pub heating_steps: u32,
    #[serde(default = "default_heating_step_ms")]
    pub heating_step_ms: u64,
    #[serde(default = "default_nozzle_target")]
    pub nozzle_target_temp: f64,
    #[serde(default = "default_bed_target")]
    pub bed_target_temp: f64,
    /// Chance per monitoring tick that the simulated printer reports a fault.
    #[serde(default)]
    pub fault_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: default_speed_multiplier(),
            heating_steps: default_heating_steps(),
            heating_step_ms: default_heating_step_ms(),
            nozzle_target_temp: default_nozzle_target(),
            bed_target_temp: default_bed_target(),
            fault_probability: 0.0,
        }
    }
}

/// Local UI settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How long result and error screens stay up before the loop continues.
    #[serde(default = "default_message_hold_ms")]
    pub message_hold_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            debounce_ms: default_debounce_ms(),
            message_hold_ms: default_message_hold_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl Config {
    /// Validate the configuration (returns Err if invalid).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("server.base_url must not be empty".to_string()));
        }
        if self.server.download_chunk_size == 0 {
            return Err(ConfigError::Invalid("server.download_chunk_size must be > 0".to_string()));
        }
        let positive = [
            ("timing.ping_interval_secs", self.timing.ping_interval_secs),
            ("timing.queue_poll_interval_secs", self.timing.queue_poll_interval_secs),
            ("timing.monitor_interval_secs", self.timing.monitor_interval_secs),
            ("simulation.speed_multiplier", self.simulation.speed_multiplier),
            ("gcode.max_estimate_minutes", self.gcode.max_estimate_minutes),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be > 0 (got {})", name, value)));
            }
        }
        if !(0.0..=1.0).contains(&self.simulation.fault_probability) {
            return Err(ConfigError::Invalid(format!(
                "simulation.fault_probability must be within 0..=1 (got {})",
                self.simulation.fault_probability
            )));
        }
        Ok(())
    }
}

fn default_base_url() -> String { "http://127.0.0.1:5000".to_string() }
fn default_printer_id() -> u64 { 1 }
fn default_request_timeout() -> u64 { 10 }
fn default_finish_timeout() -> u64 { 15 }
fn default_download_timeout() -> u64 { 60 }
fn default_chunk_size() -> usize { 2048 }
fn default_ping_interval() -> f64 { 120.0 }
fn default_queue_poll_interval() -> f64 { 10.0 }
fn default_monitor_interval() -> f64 { 2.0 }
fn default_menu_tick_ms() -> u64 { 100 }
fn default_polling_tick_ms() -> u64 { 500 }
fn default_max_lines() -> usize { 50_000 }
fn default_max_estimate_minutes() -> f64 { 20_160.0 }
fn default_cache_dir() -> PathBuf { PathBuf::from(".") }
fn default_speed_multiplier() -> f64 { 3.0 }
fn default_heating_steps() -> u32 { 5 }
fn default_heating_step_ms() -> u64 { 200 }
fn default_nozzle_target() -> f64 { 210.0 }
fn default_bed_target() -> f64 { 60.0 }
fn default_language() -> String { "en".to_string() }
fn default_debounce_ms() -> u64 { 200 }
fn default_message_hold_ms() -> u64 { 3000 }
fn default_log_level() -> String { "info".to_string() }

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            return Err(ConfigError::Io(e));
        }
    };
    config.validate()?;
    Ok(config)
}
