use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nwb2bids::config::{FileMode, RunConfig};
use nwb2bids::context::RunContext;
use nwb2bids::dataset::DatasetConverter;
use nwb2bids::metadata::{Events, TabularSidecar};
use nwb2bids::nwb::{InMemoryReader, IntervalColumn, IntervalTable, SourceRecording, Subject};
use nwb2bids::sanitization::{sanitize, SanitizationLevel, Sanitizer};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Interval table with `rows` overlapping intervals and one extra column
fn interval_table(name: &str, rows: usize) -> IntervalTable {
    let starts: Vec<f64> = (0..rows).map(|i| ((i * 7919) % rows) as f64 * 0.25).collect();
    let stops: Vec<f64> = starts.iter().enumerate().map(|(i, s)| s + (i % 5) as f64).collect();
    IntervalTable::new(name)
        .with_description("Synthetic intervals")
        .with_column(IntervalColumn::from_f64("start_time", &starts))
        .with_column(IntervalColumn::from_f64("stop_time", &stops))
        .with_column(
            IntervalColumn::new(
                "condition",
                (0..rows).map(|i| json!(format!("cond{}", i % 4))).collect(),
            )
            .with_description("Stimulus condition"),
        )
}

/// Benchmark merging and sorting interval tables into events
fn bench_events_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("events_assembly");

    for rows in [100, 1_000, 10_000] {
        let trials = interval_table("trials", rows);
        let epochs = interval_table("epochs", rows / 10);
        group.throughput(Throughput::Elements((rows + rows / 10) as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}rows", rows)),
            &rows,
            |b, _| {
                b.iter(|| {
                    let events = Events::from_tables(&[&trials, &epochs], Path::new("bench.nwb"))
                        .unwrap()
                        .unwrap();
                    events.tabular()
                });
            },
        );
    }

    group.finish();
}

/// Benchmark label sanitization, raw and memoized
fn bench_sanitization(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitization");
    let labels: Vec<String> = (0..1_000)
        .map(|i| format!("mouse_{}.session #{}", i % 50, i % 7))
        .collect();
    group.throughput(Throughput::Elements(labels.len() as u64));

    group.bench_function("pure", |b| {
        b.iter(|| {
            for label in &labels {
                sanitize(label, SanitizationLevel::Critical);
            }
        });
    });

    group.bench_function("memoized", |b| {
        let sanitizer = Sanitizer::new(SanitizationLevel::Critical);
        b.iter(|| {
            for label in &labels {
                sanitizer.sanitize(label);
            }
        });
    });

    group.finish();
}

/// Benchmark a full dataset conversion from in-memory recordings
fn bench_dataset_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dataset_conversion");
    group.sample_size(20);

    for sessions in [10, 50] {
        group.throughput(Throughput::Elements(sessions as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}sessions", sessions)),
            &sessions,
            |b, &sessions| {
                b.iter_batched(
                    || {
                        let temp_dir = TempDir::new().unwrap();
                        let sources = temp_dir.path().join("sources");
                        fs::create_dir_all(&sources).unwrap();

                        let mut reader = InMemoryReader::new();
                        for i in 0..sessions {
                            let path = sources.join(format!("session{}.nwb", i));
                            fs::write(&path, b"nwb").unwrap();
                            let mut recording = SourceRecording::new(path);
                            recording.session_id = Some(format!("{}", i));
                            recording.subject = Some(Subject {
                                subject_id: Some(format!("{}", i % 5)),
                                species: Some("Mus musculus".to_string()),
                                sex: Some("male".to_string()),
                                ..Default::default()
                            });
                            recording.trials = Some(interval_table("trials", 200));
                            reader.insert(recording);
                        }

                        let config = RunConfig::builder(temp_dir.path().join("bids"))
                            .cache_directory(temp_dir.path().join("cache"))
                            .file_mode(FileMode::Copy)
                            .build()
                            .unwrap();
                        let context = RunContext::new(config, Box::new(reader)).shared();
                        let converter = DatasetConverter::from_nwb_paths(&[&sources], context).unwrap();
                        (temp_dir, converter)
                    },
                    |(temp_dir, mut converter)| {
                        converter.convert_to_bids_dataset();
                        drop(temp_dir);
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_events_assembly,
    bench_sanitization,
    bench_dataset_conversion
);
criterion_main!(benches);
