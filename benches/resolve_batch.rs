//! Benchmarks for batch resolution overhead
//!
//! This benchmark measures:
//! - Suspend / dispatch / resume cost per request against an in-memory transport
//! - Chained requests (one dispatch per step)
//! - Response normalization

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use batch_dispatch::batch::normalize;
use batch_dispatch::{
    Dispatcher, Http, RawOutcome, RawResponse, Request, RequestDescriptor, Transport,
    TransportError,
};
use std::sync::Arc;

/// Answers every request immediately with its own URL as the body.
struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn dispatch_many(
        &self,
        requests: &[RequestDescriptor],
    ) -> Result<Vec<RawOutcome>, TransportError> {
        Ok(requests
            .iter()
            .map(|r| RawResponse::new(200, r.url.clone()).into())
            .collect())
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

fn dispatcher() -> Dispatcher {
    Dispatcher::builder()
        .transport(Arc::new(EchoTransport))
        .build()
        .expect("dispatcher")
}

fn bench_single_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let dispatcher = dispatcher();
    let mut group = c.benchmark_group("resolve_single_dispatch");

    for size in [1usize, 16, 128, 1024] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.to_async(&rt).iter(|| async {
                let requests = (0..size)
                    .map(|i| {
                        Request::new(move |http: Http| async move {
                            http.get(format!("https://bench.local/item/{}", i)).await
                        })
                    })
                    .collect();
                black_box(dispatcher.resolve(requests).await.expect("resolve"))
            })
        });
    }

    group.finish();
}

fn bench_chained(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let dispatcher = dispatcher();

    c.bench_function("resolve_chained_3_steps_x64", |b| {
        b.to_async(&rt).iter(|| async {
            let requests = (0..64)
                .map(|i| {
                    Request::new(move |http: Http| async move {
                        let mut last = String::new();
                        for step in 0..3 {
                            last = http
                                .get(format!("https://bench.local/{}/{}", i, step))
                                .await?
                                .body;
                        }
                        Ok(last)
                    })
                })
                .collect();
            black_box(dispatcher.resolve(requests).await.expect("resolve"))
        })
    });
}

fn bench_normalize(c: &mut Criterion) {
    let raw: RawOutcome = RawResponse::new(200, "x".repeat(512))
        .with_header("Content-Type", "application/json")
        .with_header("Set-Cookie", "sid=abc; Path=/; HttpOnly")
        .with_header("Set-Cookie", "theme=dark")
        .into();
    let request = RequestDescriptor::get("https://bench.local/normalize");

    c.bench_function("normalize_response", |b| {
        b.iter(|| black_box(normalize(raw.clone(), request.clone())))
    });
}

criterion_group!(benches, bench_single_dispatch, bench_chained, bench_normalize);
criterion_main!(benches);
