use criterion::{black_box, criterion_group, criterion_main, Criterion};
use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt;
use piper_core::config::UploadConfig;
use piper_engine::{CompressionOrchestrator, ProcessEngine};
use piper_server::{app_with_state, state::AppState};
use piper_storage::ArtifactStore;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn state(tmp: &TempDir) -> AppState {
    let engine = ProcessEngine::new("true", tmp.path());
    let store = ArtifactStore::new(tmp.path());
    let orchestrator = CompressionOrchestrator::new(Arc::new(engine), store, Duration::from_secs(30));
    AppState::new(orchestrator, UploadConfig::default())
}

fn bench_http_health(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    c.bench_function("http_health_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..1000 {
                    let app = app_with_state(state.clone());
                    let req = Request::builder()
                        .uri("/health")
                        .body(Body::empty())
                        .unwrap();
                    let resp = app.oneshot(req).await.unwrap();
                    black_box(resp.status());
                }
            })
        })
    });
}

fn bench_http_download(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let mut blob = vec![0u8; 64 * 1024];
    rand::thread_rng().fill_bytes(&mut blob);
    let id = rt
        .block_on(state.orchestrator.store().put("bench.txt", &blob))
        .unwrap()
        .id
        .to_string();

    c.bench_function("http_download_64kb_x100", |b| {
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..100 {
                    let app = app_with_state(state.clone());
                    let req = Request::builder()
                        .uri(format!("/api/download/{id}"))
                        .body(Body::empty())
                        .unwrap();
                    let resp = app.oneshot(req).await.unwrap();
                    black_box(resp.status());
                }
            })
        })
    });
}

criterion_group!(benches, bench_http_health, bench_http_download);
criterion_main!(benches);
