//! ORC Lifecycle Benchmarks
//!
//! Retain/release hot path and the allocate → release round trip.
//! Run with: `cargo bench --package orc`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use orc::{ClassBuilder, ClassId, ClassRegistry, PropertyKind, RuntimeConfig, SystemRuntime};
use std::sync::Arc;

const WORD: usize = std::mem::size_of::<usize>();

fn create_runtime() -> (SystemRuntime, ClassId) {
    let config = RuntimeConfig {
        track_allocations: false,
        stats_enabled: false,
        ..Default::default()
    };
    let runtime = SystemRuntime::with_system_memory(Arc::new(ClassRegistry::new()), config).unwrap();
    let class = runtime
        .publish(
            ClassBuilder::new("Node")
                .instance_size(2 * WORD)
                .property("next", 0, PropertyKind::Retained)
                .property("value", WORD, PropertyKind::Scalar { size: WORD }),
        )
        .unwrap();
    (runtime, class)
}

fn bench_retain_release(c: &mut Criterion) {
    let (runtime, class) = create_runtime();
    let object = runtime.allocate(class, 0);

    let mut group = c.benchmark_group("retain_release");
    group.throughput(Throughput::Elements(1));

    group.bench_function("increment_decrement", |b| {
        b.iter(|| unsafe {
            runtime.increment(black_box(object));
            black_box(runtime.decrement_was_zero(Some(object)))
        })
    });

    group.bench_function("read_count", |b| {
        b.iter(|| unsafe { black_box(runtime.read_count(black_box(object))) })
    });

    group.finish();

    unsafe { runtime.release_zeroing(Some(object)).unwrap() };
}

fn bench_allocate_release(c: &mut Criterion) {
    let (runtime, class) = create_runtime();
    let mut group = c.benchmark_group("allocate_release");

    for extra in [0usize, 64, 1024] {
        group.bench_with_input(BenchmarkId::new("zeroed", extra), &extra, |b, &extra| {
            b.iter(|| unsafe {
                let object = runtime.allocate(class, extra);
                black_box(runtime.release_zeroing(Some(object)).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("non_zeroed", extra), &extra, |b, &extra| {
            b.iter(|| unsafe {
                let object = runtime.allocate_non_zeroed(class, extra);
                object.payload_at(0).cast::<usize>().write(0);
                black_box(runtime.release_zeroing(Some(object)).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_linked_teardown(c: &mut Criterion) {
    let (runtime, class) = create_runtime();

    c.bench_function("release_linked_list_100", |b| {
        b.iter(|| unsafe {
            let head = runtime.allocate(class, 0);
            let mut tail = head;
            for _ in 0..99 {
                let next = runtime.allocate(class, 0);
                tail.payload_at(0).cast::<*mut u8>().write(next.as_ptr());
                tail = next;
            }
            black_box(runtime.release_zeroing(Some(head)).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_retain_release,
    bench_allocate_release,
    bench_linked_teardown
);
criterion_main!(benches);
