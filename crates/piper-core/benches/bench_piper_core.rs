use criterion::{black_box, criterion_group, criterion_main, Criterion};
use piper_core::config::PiperConfig;
use piper_core::types::{ArtifactRecord, CompressionStats};
use rand::Rng;

fn bench_stats_from_sizes(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let sizes: Vec<(u64, u64)> = (0..1000)
        .map(|_| (rng.gen_range(0..1_000_000), rng.gen_range(0..1_000_000)))
        .collect();

    c.bench_function("stats_from_sizes_1000", |b| {
        b.iter(|| {
            for &(orig, comp) in &sizes {
                black_box(CompressionStats::from_sizes(orig, comp));
            }
        })
    });
}

fn bench_artifact_record(c: &mut Criterion) {
    c.bench_function("artifact_record_new_1000", |b| {
        b.iter(|| {
            for i in 0..1000u64 {
                black_box(ArtifactRecord::new(format!("file_{i}.txt"), i));
            }
        })
    });
}

fn bench_config_overrides(c: &mut Criterion) {
    c.bench_function("config_env_overrides", |b| {
        b.iter(|| {
            let cfg = PiperConfig::default()
                .apply_overrides(|k| match k {
                    "PIPER_PORT" => Some("8081".into()),
                    "PIPER_ENGINE_ARGS" => Some("run --quiet --".into()),
                    _ => None,
                })
                .unwrap();
            black_box(cfg);
        })
    });
}

criterion_group!(benches, bench_stats_from_sizes, bench_artifact_record, bench_config_overrides);
criterion_main!(benches);
