//! Benchmarks for the query-time paths
//!
//! Run with: cargo bench --bench recommend
//!
//! Uses the small fixture artifacts under tests/fixtures.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crop_advisor::{CropRecommender, Feature, FeatureVector, MonthShift, RainfallTable};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn reference_features() -> FeatureVector {
    FeatureVector::default()
        .with(Feature::Nitrogen, 90.0)
        .with(Feature::Phosphorus, 42.0)
        .with(Feature::Potassium, 43.0)
        .with(Feature::Ph, 6.5)
        .with(Feature::Temperature, 25.0)
        .with(Feature::Humidity, 80.0)
        .with(Feature::Rainfall, 200.0)
}

fn bench_score(c: &mut Criterion) {
    let recommender =
        CropRecommender::load(&fixture("crop_model.json")).expect("Failed to load model fixture");
    let features = reference_features();

    c.bench_function("recommender_score", |b| {
        b.iter(|| black_box(recommender.score(black_box(&features))))
    });
}

fn bench_parse_payload(c: &mut Criterion) {
    let payload = serde_json::json!({
        "N": 90, "P": "42", "K": 43, "pH": 6.5,
        "temp": 25, "humidity": 80, "rainfall": 200
    });
    let map = payload.as_object().unwrap().clone();

    c.bench_function("feature_vector_from_json", |b| {
        b.iter(|| black_box(FeatureVector::from_json_map(black_box(&map)).unwrap()))
    });
}

fn bench_rainfall(c: &mut Criterion) {
    let table =
        RainfallTable::from_csv(&fixture("rainfall.csv")).expect("Failed to load rainfall fixture");

    c.bench_function("average_rainfall_monsoon", |b| {
        b.iter(|| {
            black_box(
                table
                    .average_rainfall(black_box("Kerala"), 7, MonthShift::Calendar)
                    .unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_score, bench_parse_payload, bench_rainfall);
criterion_main!(benches);
