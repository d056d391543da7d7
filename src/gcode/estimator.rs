// src/gcode/estimator.rs - Streaming print time / material estimator
use std::f64::consts::PI;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::EstimateError;

/// Feed rate assumed until the source sets one, in units/min.
pub const DEFAULT_FEEDRATE: f64 = 1500.0;

const PROGRESS_LOG_EVERY: usize = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Position {
    x: f64,
    y: f64,
    z: f64,
    e: f64,
}

impl Position {
    fn distance_to(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Totals accumulated over one G-code source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GcodeTotals {
    pub time_minutes: f64,
    pub extrusion_mm: f64,
    pub layers: u32,
    /// Significant (non-empty, non-comment) lines consumed.
    pub lines: usize,
}

/// Incremental estimator over linear moves.
///
/// Feed it one line at a time; it never holds more than the current line and
/// the running totals, so a multi-megabyte file costs the same memory as a
/// ten-line one.
#[derive(Debug, Clone)]
pub struct GcodeEstimator {
    position: Position,
    feedrate: f64,
    total_time_secs: f64,
    total_extrusion: f64,
    layers: u32,
    lines: usize,
}

impl Default for GcodeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl GcodeEstimator {
    pub fn new() -> Self {
        Self {
            position: Position::default(),
            feedrate: DEFAULT_FEEDRATE,
            total_time_secs: 0.0,
            total_extrusion: 0.0,
            layers: 0,
            lines: 0,
        }
    }

    /// Back to origin, default feed rate, zero totals.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Consume one non-empty, non-comment source line. Never fails: anything
    /// that is not a well-formed G0/G1 parameter is ignored.
    pub fn consume_line(&mut self, line: &str) {
        self.lines += 1;

        let code = match line.split_once(';') {
            Some((code, _)) => code.trim(),
            None => line.trim(),
        };
        let mut tokens = code.split_whitespace();
        let Some(command) = tokens.next() else {
            return;
        };
        if !(command.eq_ignore_ascii_case("G0") || command.eq_ignore_ascii_case("G1")) {
            return;
        }

        self.apply_move(tokens);

        // Layer heuristic: any Z on a move line counts, even when Z is unchanged.
        if code.contains(['Z', 'z']) {
            self.layers += 1;
        }
    }

    fn apply_move<'a>(&mut self, tokens: impl Iterator<Item = &'a str>) {
        let mut target = self.position;
        let mut feedrate = self.feedrate;

        for token in tokens {
            let mut chars = token.chars();
            let Some(axis) = chars.next() else { continue };
            let Some(value) = parse_value(chars.as_str()) else { continue };
            match axis.to_ascii_uppercase() {
                'X' => target.x = value,
                'Y' => target.y = value,
                'Z' => target.z = value,
                'E' => target.e = value,
                'F' if value > 0.0 => feedrate = value,
                _ => {}
            }
        }

        let distance = self.position.distance_to(&target);
        if distance > 0.0 {
            self.total_time_secs += distance / feedrate * 60.0;
        }

        let extruded = target.e - self.position.e;
        if extruded > 0.0 {
            self.total_extrusion += extruded;
        }

        self.position = target;
        self.feedrate = feedrate;
    }

    pub fn total_extrusion(&self) -> f64 {
        self.total_extrusion
    }

    pub fn total_time_secs(&self) -> f64 {
        self.total_time_secs
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    pub fn feedrate(&self) -> f64 {
        self.feedrate
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn finish(&self) -> GcodeTotals {
        GcodeTotals {
            time_minutes: self.total_time_secs / 60.0,
            extrusion_mm: self.total_extrusion,
            layers: self.layers,
            lines: self.lines,
        }
    }
}

fn parse_value(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Filament weight in grams for `extrusion_mm` of filament.
///
/// Treats the filament as a cylinder: `π·(d/2)²·L` mm³, divided by 1000 for
/// cm³, times density in g/cm³.
pub fn weight_from_extrusion(extrusion_mm: f64, filament_diameter_mm: f64, density_g_per_cm3: f64) -> f64 {
    let radius_mm = filament_diameter_mm / 2.0;
    let volume_mm3 = PI * radius_mm * radius_mm * extrusion_mm;
    let volume_cm3 = volume_mm3 / 1000.0;
    volume_cm3 * density_g_per_cm3
}

/// Run the estimator over an async line source, one line in memory at a time.
///
/// Stops with [`EstimateError::LineCeilingExceeded`] as soon as the number of
/// significant lines passes `max_lines`.
pub async fn estimate_stream<R>(mut reader: R, max_lines: usize) -> Result<GcodeTotals, EstimateError>
where
    R: AsyncBufRead + Unpin,
{
    let mut estimator = GcodeEstimator::new();
    let mut buf = String::new();

    loop {
        buf.clear();
        let bytes = reader.read_line(&mut buf).await?;
        if bytes == 0 {
            break;
        }
        let line = buf.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if estimator.lines() >= max_lines {
            return Err(EstimateError::LineCeilingExceeded { limit: max_lines });
        }
        estimator.consume_line(line);
        if estimator.lines() % PROGRESS_LOG_EVERY == 0 {
            tracing::debug!("Estimator processed {} lines", estimator.lines());
        }
    }

    let totals = estimator.finish();
    tracing::info!(
        "G-code parsed: {} lines, {:.2} min, {:.2} mm extruded, {} layers",
        totals.lines, totals.time_minutes, totals.extrusion_mm, totals.layers
    );
    Ok(totals)
}
