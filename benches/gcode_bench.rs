// Benchmark for G-code estimation throughput
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use krusty_node::gcode::{estimate_stream, GcodeEstimator};
use krusty_node::sim::sample_gcode;

fn bench_estimator_lines(c: &mut Criterion) {
    let lines: Vec<String> = (0..10_000)
        .map(|i| format!("G1 X{} Y{} E{:.3} F1500", i % 200, (i * 7) % 200, f64::from(i) * 0.05))
        .collect();
    c.bench_function("estimate 10k G1 lines", |b| {
        b.iter(|| {
            let mut est = GcodeEstimator::new();
            for line in &lines {
                est.consume_line(line);
            }
            assert_eq!(est.lines(), 10_000);
        });
    });
}

fn bench_estimate_stream(c: &mut Criterion) {
    let gcode = sample_gcode(500);
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    c.bench_function("stream 500-layer sample part", |b| {
        b.iter(|| {
            rt.block_on(async {
                let totals = estimate_stream(gcode.as_bytes(), 50_000).await.unwrap();
                assert_eq!(totals.layers, 500);
            });
        });
    });
}

criterion_group!(benches, bench_estimator_lines, bench_estimate_stream);
criterion_main!(benches);
