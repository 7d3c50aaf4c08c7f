//! Basic benchmarks for the `free_list` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::num::NonZero;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use free_list::{FreeList, IntegrityChecks, SinglyLinked};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = [f32; 4];
const TEST_VALUE: TestItem = [1.0, 2.0, 3.0, 4.0];

/// Number of values in the pre-populated lists used by the erase and iteration benchmarks.
const POPULATED_LEN: usize = 10_000;

fn populated_list() -> FreeList<TestItem> {
    let mut list = FreeList::builder()
        .capacity_increments(NonZero::new(1024).unwrap())
        .integrity_checks(IntegrityChecks::Never)
        .build();

    for _ in 0..POPULATED_LEN {
        list.push(TEST_VALUE);
    }

    // Every fourth slot vacant, so iteration has to jump over free slots.
    for index in (0..POPULATED_LEN).step_by(4) {
        list.erase(index, 1);
    }

    list
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("free_list_basic");

    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(FreeList::<TestItem>::new()));
            }

            start.elapsed()
        });
    });

    group.bench_function("push_one", |b| {
        b.iter_custom(|iters| {
            let mut lists = iter::repeat_with(|| {
                FreeList::<TestItem>::builder()
                    .initial_capacity(1)
                    .integrity_checks(IntegrityChecks::Never)
                    .build()
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let start = Instant::now();

            for list in &mut lists {
                _ = black_box(list.push(black_box(TEST_VALUE)));
            }

            start.elapsed()
        });
    });

    group.bench_function("push_one_singly", |b| {
        b.iter_custom(|iters| {
            let mut lists = iter::repeat_with(|| {
                FreeList::<u64, SinglyLinked>::builder()
                    .initial_capacity(1)
                    .integrity_checks(IntegrityChecks::Never)
                    .build()
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let start = Instant::now();

            for list in &mut lists {
                _ = black_box(list.push(black_box(42)));
            }

            start.elapsed()
        });
    });

    group.bench_function("push_erase_cycle", |b| {
        b.iter_custom(|iters| {
            let mut list = populated_list();

            let start = Instant::now();

            for _ in 0..iters {
                let index = list.push(black_box(TEST_VALUE));
                list.erase(black_box(index), 1);
            }

            start.elapsed()
        });
    });

    group.bench_function("push_slice_16", |b| {
        b.iter_custom(|iters| {
            let values = [TEST_VALUE; 16];
            let mut list = populated_list();

            let start = Instant::now();

            for _ in 0..iters {
                let index = list.push_slice(black_box(&values));
                list.erase(black_box(index), values.len());
            }

            start.elapsed()
        });
    });

    group.bench_function("read_one", |b| {
        b.iter_custom(|iters| {
            let list = populated_list();

            let start = Instant::now();

            for _ in 0..iters {
                _ = black_box(list[black_box(POPULATED_LEN / 2 + 1)]);
            }

            start.elapsed()
        });
    });

    group.bench_function("iter_all", |b| {
        b.iter_custom(|iters| {
            let list = populated_list();

            let start = Instant::now();

            for _ in 0..iters {
                for (index, value) in &list {
                    black_box((index, value));
                }
            }

            start.elapsed()
        });
    });

    group.bench_function("regions_all", |b| {
        b.iter_custom(|iters| {
            let list = populated_list();

            let start = Instant::now();

            for _ in 0..iters {
                for (index, values) in list.regions() {
                    black_box((index, values));
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}
