//! Wire models for the job server API.
//!
//! The server has shipped both camelCase and PascalCase field names over time,
//! so every inbound field accepts either spelling. Optional fields that are
//! missing or `null` fall back to documented defaults.

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_FILAMENT_DIAMETER_MM: f64 = 1.75;
pub const DEFAULT_DENSITY_G_PER_CM3: f64 = 1.24;

/// Filament required by a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    #[serde(rename = "materialType", alias = "MaterialType", default = "unknown", deserialize_with = "string_or_unknown")]
    pub material_type: String,
    #[serde(rename = "color", alias = "Color", default = "unknown", deserialize_with = "string_or_unknown")]
    pub color: String,
    #[serde(rename = "diameterMm", alias = "DiameterMm", default = "default_diameter", deserialize_with = "diameter_or_default")]
    pub diameter_mm: f64,
    #[serde(
        rename = "densityInGramsPerCm3",
        alias = "DensityInGramsPerCm3",
        default = "default_density",
        deserialize_with = "density_or_default"
    )]
    pub density_g_per_cm3: f64,
}

impl Default for MaterialSpec {
    fn default() -> Self {
        Self {
            material_type: unknown(),
            color: unknown(),
            diameter_mm: DEFAULT_FILAMENT_DIAMETER_MM,
            density_g_per_cm3: DEFAULT_DENSITY_G_PER_CM3,
        }
    }
}

/// A queued print job as handed out by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "id", alias = "Id")]
    pub id: u64,
    #[serde(rename = "gCodeFilePath", alias = "GCodeFilePath", default)]
    pub gcode_file_path: Option<String>,
    #[serde(rename = "requiredMaterial", alias = "RequiredMaterial", default, deserialize_with = "material_or_default")]
    pub required_material: MaterialSpec,
    #[serde(
        rename = "estimatedPrintTimeMinutes",
        alias = "EstimatedPrintTimeMinutes",
        default,
        deserialize_with = "number_or_zero"
    )]
    pub estimated_print_time_minutes: f64,
    #[serde(
        rename = "estimatedMaterialInGrams",
        alias = "EstimatedMaterialInGrams",
        default,
        deserialize_with = "number_or_zero"
    )]
    pub estimated_material_grams: f64,
}

impl Job {
    pub fn new(id: u64, gcode_file_path: impl Into<String>) -> Self {
        Self {
            id,
            gcode_file_path: Some(gcode_file_path.into()),
            required_material: MaterialSpec::default(),
            estimated_print_time_minutes: 0.0,
            estimated_material_grams: 0.0,
        }
    }
}

/// Queue body: either a bare array or wrapped in `data`/`Data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QueueResponse {
    Wrapped {
        #[serde(alias = "Data")]
        data: Vec<Job>,
    },
    Bare(Vec<Job>),
}

impl QueueResponse {
    pub fn into_jobs(self) -> Vec<Job> {
        match self {
            QueueResponse::Wrapped { data } => data,
            QueueResponse::Bare(jobs) => jobs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PingRequest {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartJobRequest {
    pub actual_estimated_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FinishJobRequest {
    pub is_success: bool,
    pub actual_material_in_grams: Option<f64>,
    pub error_message: Option<String>,
}

fn unknown() -> String { "Unknown".to_string() }
fn default_diameter() -> f64 { DEFAULT_FILAMENT_DIAMETER_MM }
fn default_density() -> f64 { DEFAULT_DENSITY_G_PER_CM3 }

fn string_or_unknown<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(unknown))
}

fn positive_or<'de, D: Deserializer<'de>>(d: D, fallback: f64) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(fallback))
}

fn diameter_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    positive_or(d, DEFAULT_FILAMENT_DIAMETER_MM)
}

fn density_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    positive_or(d, DEFAULT_DENSITY_G_PER_CM3)
}

fn number_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(0.0))
}

fn material_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<MaterialSpec, D::Error> {
    Ok(Option::<MaterialSpec>::deserialize(d)?.unwrap_or_default())
}
