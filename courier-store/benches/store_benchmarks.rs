//! Benchmarks for `MessageStore`'s hot paths: record insertion and the
//! transactional read-modify-write that backs `update_content`/
//! `update_status`.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::{hint::black_box, time::Duration};

use courier_common::{Message, MessageId, Status};
use courier_store::MessageStore;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

fn sample(id: MessageId, size: usize) -> Message {
    Message::pending(id, "sms".into(), "twilio".into(), vec![b'X'; size])
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_add");

    for (size, desc) in [(64, "64B"), (1024, "1KB"), (64 * 1024, "64KB")] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(desc), &size, |b, &size| {
            b.iter_batched(
                || (MessageStore::open_temporary(), MessageId::generate_at(Duration::from_millis(1))),
                |(store, id)| {
                    store.add(black_box(&sample(id, size))).expect("add succeeds");
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_get");

    let store = MessageStore::open_temporary();
    let id = MessageId::generate_at(Duration::from_millis(1));
    store.add(&sample(id, 1024)).expect("add succeeds");

    group.bench_function("get_existing", |b| {
        b.iter(|| {
            let message = store.get(black_box(id)).expect("get succeeds");
            black_box(message)
        });
    });

    group.finish();
}

fn bench_update_status(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_update_status");

    group.bench_function("transition_pending_to_sent", |b| {
        b.iter_batched(
            || {
                let store = MessageStore::open_temporary();
                let id = MessageId::generate_at(Duration::from_millis(1));
                store.add(&sample(id, 1024)).unwrap();
                (store, id)
            },
            |(store, id)| {
                store.update_status(black_box(id), Status::Sent).expect("update succeeds");
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_add, bench_get, bench_update_status);
criterion_main!(benches);
