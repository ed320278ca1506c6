//! # vthread benchmarks
//!
//! Fork/join fan-out through the structured scope provider, on carrier
//! threads and on plain platform threads.
//!
//! ## Usage
//! ```bash
//! cargo bench -p vthread            # run all
//! cargo bench -p vthread fan_out    # only the scope fan-out group
//! ```

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vthread::{
    CarrierConfig, CarrierRuntime, PlatformRuntime, StructuredTaskScopeProvider, ThreadFactory,
    ThreadScopeProvider, VirtualThreadRuntime, VtError,
};

const FAN_OUT: [usize; 3] = [1, 16, 128];

fn fan_out(
    provider: &Arc<dyn StructuredTaskScopeProvider>,
    factory: &Arc<dyn ThreadFactory>,
    n: usize,
) -> usize {
    provider
        .with_all(None, factory.clone(), |scope| {
            let parts = (0..n)
                .map(|i| scope.fork(move |_| Ok::<_, VtError>(black_box(i))))
                .collect::<Result<Vec<_>, _>>()?;
            scope.join()?.throw_if_failed()?;
            parts.into_iter().map(|p| p.get()).sum::<Result<usize, _>>()
        })
        .unwrap_or_default()
}

// ============================================================================
// Scope fan-out
// ============================================================================

fn bench_fan_out(c: &mut Criterion) {
    let provider: Arc<dyn StructuredTaskScopeProvider> = Arc::new(ThreadScopeProvider::new());
    let carriers = CarrierRuntime::new(CarrierConfig::new()).thread_factory("bench-vt-");
    let platform = PlatformRuntime::new().thread_factory("bench-os-");

    let mut group = c.benchmark_group("fan_out");
    for n in FAN_OUT {
        group.bench_with_input(BenchmarkId::new("carrier", n), &n, |b, &n| {
            b.iter(|| fan_out(&provider, &carriers, n))
        });
        group.bench_with_input(BenchmarkId::new("platform", n), &n, |b, &n| {
            b.iter(|| fan_out(&provider, &platform, n))
        });
    }
    group.finish();
}

// ============================================================================
// First success
// ============================================================================

fn bench_any_first_success(c: &mut Criterion) {
    let provider: Arc<dyn StructuredTaskScopeProvider> = Arc::new(ThreadScopeProvider::new());
    let carriers = CarrierRuntime::new(CarrierConfig::new()).thread_factory("bench-any-");

    c.bench_function("any_first_success_8", |b| {
        b.iter(|| {
            provider
                .with_any(None, carriers.clone(), |scope| {
                    for i in 0..8_usize {
                        scope.fork(move |token| {
                            if i == 0 {
                                Ok(i)
                            } else {
                                token.check().map(|_| i)
                            }
                        })?;
                    }
                    Ok::<_, VtError>(scope.result(VtError::Execution))
                })
                .ok()
        })
    });
}

criterion_group!(fan_out_benches, bench_fan_out);
criterion_group!(any_benches, bench_any_first_success);
criterion_main!(fan_out_benches, any_benches);
