use std::io::Write;

use krusty_node::config::GcodeConfig;
use krusty_node::gcode::{
    estimate_stream, resolve_estimate, weight_from_extrusion, EstimateError, EstimateSource, GcodeEstimator,
    FALLBACK_LAYERS, FALLBACK_MATERIAL_GRAMS, FALLBACK_TIME_MINUTES,
};
use krusty_node::service::Job;
use krusty_node::sim::sample_gcode;

#[tokio::test]
async fn test_single_extruding_move() {
    let source = "G1 X10 Y0 Z0 E5 F600\n";
    let totals = estimate_stream(source.as_bytes(), 1000).await.unwrap();
    assert_eq!(totals.extrusion_mm, 5.0);
    assert_eq!(totals.layers, 1);
    // 10 mm at 600 mm/min
    assert!((totals.time_minutes * 60.0 - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_two_moves_use_absolute_extrusion() {
    let source = "G1 X10 Y0 Z0 E5 F1200\nG1 X10 Y10 Z0 E5\n";
    let totals = estimate_stream(source.as_bytes(), 1000).await.unwrap();
    // E5 twice in absolute mode is one 5 mm push
    assert_eq!(totals.extrusion_mm, 5.0);
    assert_eq!(totals.layers, 2);
    // 10 mm then 10 mm, both at 1200 mm/min
    assert!((totals.time_minutes * 60.0 - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_blank_and_comment_lines_do_not_count() {
    let source = "\n; header\n   \nG1 X1\n;G1 X100\n\nG1 X2\n";
    let totals = estimate_stream(source.as_bytes(), 2).await.unwrap();
    assert_eq!(totals.lines, 2);
}

#[tokio::test]
async fn test_line_ceiling_aborts_stream() {
    let source = "G1 X1\nG1 X2\nG1 X3\n";
    let err = estimate_stream(source.as_bytes(), 2).await.unwrap_err();
    assert!(matches!(err, EstimateError::LineCeilingExceeded { limit: 2 }));
}

#[test]
fn test_retractions_never_reduce_extrusion() {
    let mut est = GcodeEstimator::new();
    est.consume_line("G1 X10 E4");
    let before = est.total_extrusion();
    est.consume_line("G1 E2");
    est.consume_line("G1 E-3");
    assert_eq!(est.total_extrusion(), before);
    // Priming back after a retraction counts from the retracted position.
    est.consume_line("G1 E1");
    assert_eq!(est.total_extrusion(), before + 4.0);
}

#[test]
fn test_weight_is_zero_without_extrusion_and_grows_with_it() {
    assert_eq!(weight_from_extrusion(0.0, 1.75, 1.24), 0.0);
    let mut last = 0.0;
    for mm in [1.0, 10.0, 250.0, 4000.0] {
        let grams = weight_from_extrusion(mm, 1.75, 1.24);
        assert!(grams > last);
        last = grams;
    }
    assert!(weight_from_extrusion(100.0, 2.85, 1.24) > weight_from_extrusion(100.0, 1.75, 1.24));
    assert!(weight_from_extrusion(100.0, 1.75, 2.0) > weight_from_extrusion(100.0, 1.75, 1.24));
}

#[tokio::test]
async fn test_sample_part_totals() {
    let totals = estimate_stream(sample_gcode(3).as_bytes(), 10_000).await.unwrap();
    assert_eq!(totals.layers, 3);
    assert!((totals.extrusion_mm - 3.0 * 4.0 * 0.8).abs() < 1e-6);
    assert!(totals.time_minutes > 0.0);
}

fn write_source(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("part.gcode");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

#[tokio::test]
async fn test_resolve_uses_parsed_totals_and_job_material() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(&dir, "G1 X100 E1000 F6000\n");
    let job = Job::new(1, "a.gcode");

    let estimate = resolve_estimate(&path, &job, &GcodeConfig::default()).await;
    assert_eq!(estimate.source, EstimateSource::Parsed);
    assert!((estimate.material_grams - 2.9825).abs() < 0.001);
    assert!((estimate.time_minutes - 100.0 / 6000.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_resolve_falls_back_to_server_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::new(2, "a.gcode");
    job.estimated_print_time_minutes = 12.0;
    job.estimated_material_grams = 3.5;

    let estimate = resolve_estimate(&dir.path().join("gone.gcode"), &job, &GcodeConfig::default()).await;
    assert_eq!(estimate.source, EstimateSource::Server);
    assert_eq!(estimate.time_minutes, 12.0);
    assert_eq!(estimate.material_grams, 3.5);
    assert_eq!(estimate.layers, FALLBACK_LAYERS);
}

#[tokio::test]
async fn test_resolve_replaces_zero_material_with_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(&dir, "G1 X10 F600\n");
    let job = Job::new(3, "a.gcode");

    let estimate = resolve_estimate(&path, &job, &GcodeConfig::default()).await;
    assert_eq!(estimate.source, EstimateSource::Parsed);
    assert_eq!(estimate.material_grams, FALLBACK_MATERIAL_GRAMS);
    assert!(estimate.time_minutes > 0.0);
}

#[tokio::test]
async fn test_resolve_ignores_implausible_print_times() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(&dir, "G1 X1e150 E5\n");
    let mut job = Job::new(4, "a.gcode");
    job.estimated_print_time_minutes = 1e18;

    let estimate = resolve_estimate(&path, &job, &GcodeConfig::default()).await;
    assert_eq!(estimate.source, EstimateSource::Parsed);
    assert_eq!(estimate.time_minutes, FALLBACK_TIME_MINUTES);

    job.estimated_print_time_minutes = 90.0;
    let estimate = resolve_estimate(&path, &job, &GcodeConfig::default()).await;
    assert_eq!(estimate.time_minutes, 90.0);
}
