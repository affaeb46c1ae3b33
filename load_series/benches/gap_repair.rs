//! Benchmarks for the gap repair engine.

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use load_series::{GapRepairEngine, RepairConfig, SeriesPoint};

/// `days` of 15-minute points with every tenth point missing
fn create_series(days: usize) -> Vec<SeriesPoint> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..days * 96)
        .filter(|i| i % 10 != 3)
        .map(|i| {
            let load = 55_000.0 + (i as f64 * 0.065).sin() * 6_000.0;
            SeriesPoint {
                timestamp: start + Duration::minutes(15 * i as i64),
                forecast_day_minus1: Some(load + 400.0),
                forecast_day: Some(load - 150.0),
                consumption: Some(load),
            }
        })
        .collect()
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("GapRepair");

    for days in [7, 90, 365].iter() {
        let series = create_series(*days);

        for (label, outlier_filter) in [("filtered", true), ("unfiltered", false)] {
            let engine = GapRepairEngine::new(RepairConfig {
                outlier_filter,
                ..RepairConfig::default()
            })
            .unwrap();

            group.bench_with_input(BenchmarkId::new(label, days), &series, |b, series| {
                b.iter(|| engine.repair(black_box(series)))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_repair);
criterion_main!(benches);
